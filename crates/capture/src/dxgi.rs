//! DXGI output-duplication backend for the accelerated capture path
//!
//! One duplication session is bound to the first output of the first adapter.
//! Each registered zone owns a staging texture sized to its rectangle plus a
//! CPU-side pixel store; a frame capture copies the desktop image into every
//! staging texture and drains them all, so one `capture_frame` call services
//! every zone.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_UNKNOWN;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_BOX, D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAPPED_SUBRESOURCE,
    D3D11_MAP_READ, D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_SAMPLE_DESC};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory1, IDXGIFactory1, IDXGIOutput1, IDXGIOutputDuplication, IDXGIResource,
    DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
};

use crate::{
    AcceleratedBackend, CaptureError, CaptureRegion, CaptureResult, PixelFormat, ZoneId,
};

struct DxgiZone {
    region: CaptureRegion,
    staging: ID3D11Texture2D,
    /// Latest pixels in tight BGRA rows, refreshed on every frame capture.
    /// Locked while being written out of the staging texture and while being
    /// copied into the caller's buffer.
    pixels: Mutex<Vec<u8>>,
}

/// Accelerated backend over DXGI desktop duplication.
pub struct DxgiBackend {
    device: Option<ID3D11Device>,
    context: Option<ID3D11DeviceContext>,
    duplication: Option<IDXGIOutputDuplication>,
    output_size: (u32, u32),
    timeout_ms: u32,
    zones: Vec<DxgiZone>,
}

impl DxgiBackend {
    pub fn new() -> Self {
        Self {
            device: None,
            context: None,
            duplication: None,
            output_size: (0, 0),
            timeout_ms: 1000,
            zones: Vec::new(),
        }
    }

    fn copy_zones(
        &self,
        context: &ID3D11DeviceContext,
        resource: Option<IDXGIResource>,
    ) -> CaptureResult<()> {
        let resource = resource.ok_or_else(|| {
            CaptureError::CaptureFailed("AcquireNextFrame returned no resource".into())
        })?;
        let desktop: ID3D11Resource = resource
            .cast()
            .map_err(|err| CaptureError::CaptureFailed(format!("desktop resource: {err}")))?;

        for zone in &self.zones {
            let r = zone.region;
            let src_box = D3D11_BOX {
                left: r.x as u32,
                top: r.y as u32,
                front: 0,
                right: r.x as u32 + r.width,
                bottom: r.y as u32 + r.height,
                back: 1,
            };
            let staging: ID3D11Resource = zone
                .staging
                .cast()
                .map_err(|err| CaptureError::CaptureFailed(format!("staging resource: {err}")))?;
            unsafe {
                context.CopySubresourceRegion(&staging, 0, 0, 0, 0, &desktop, 0, Some(&src_box));
            }
            self.drain_staging(context, zone, &staging)?;
        }
        Ok(())
    }

    /// Map the zone's staging texture and copy its rows into the CPU-side
    /// store under the zone's lock.
    fn drain_staging(
        &self,
        context: &ID3D11DeviceContext,
        zone: &DxgiZone,
        staging: &ID3D11Resource,
    ) -> CaptureResult<()> {
        unsafe {
            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            context
                .Map(staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                .map_err(|err| CaptureError::CaptureFailed(format!("Map: {err}")))?;

            let width = zone.region.width as usize;
            let height = zone.region.height as usize;
            let row_pitch = mapped.RowPitch as usize;
            let src = std::slice::from_raw_parts(mapped.pData as *const u8, row_pitch * height);

            {
                let mut pixels = zone.pixels.lock();
                for y in 0..height {
                    let row = &src[y * row_pitch..y * row_pitch + width * 4];
                    pixels[y * width * 4..(y + 1) * width * 4].copy_from_slice(row);
                }
            }

            context.Unmap(staging, 0);
        }
        Ok(())
    }
}

impl Default for DxgiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AcceleratedBackend for DxgiBackend {
    fn open(&mut self, timeout: Duration) -> CaptureResult<()> {
        if self.duplication.is_some() {
            return Ok(());
        }
        self.timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;

        unsafe {
            let factory: IDXGIFactory1 = CreateDXGIFactory1().map_err(|err| {
                CaptureError::InitFailed(format!("CreateDXGIFactory1: {err}"))
            })?;
            let adapter = factory.EnumAdapters(0).map_err(|_| CaptureError::NoAdapters)?;
            let output = adapter.EnumOutputs(0).map_err(|_| CaptureError::NoOutputs)?;
            let desc = output
                .GetDesc()
                .map_err(|err| CaptureError::InitFailed(format!("output desc: {err}")))?;
            let rect = desc.DesktopCoordinates;
            let output_width = (rect.right - rect.left).max(0) as u32;
            let output_height = (rect.bottom - rect.top).max(0) as u32;

            let mut device: Option<ID3D11Device> = None;
            let mut context: Option<ID3D11DeviceContext> = None;
            D3D11CreateDevice(
                &adapter,
                D3D_DRIVER_TYPE_UNKNOWN,
                None,
                D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                None,
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )
            .map_err(|err| CaptureError::InitFailed(format!("D3D11CreateDevice: {err}")))?;
            let device = device.ok_or_else(|| {
                CaptureError::InitFailed("D3D11CreateDevice returned no device".into())
            })?;
            let context = context.ok_or_else(|| {
                CaptureError::InitFailed("D3D11CreateDevice returned no context".into())
            })?;

            let output1: IDXGIOutput1 = output
                .cast()
                .map_err(|err| CaptureError::InitFailed(format!("IDXGIOutput1: {err}")))?;
            let duplication = output1
                .DuplicateOutput(&device)
                .map_err(|err| CaptureError::InitFailed(format!("DuplicateOutput: {err}")))?;

            info!(output_width, output_height, "DXGI output duplication opened");

            self.device = Some(device);
            self.context = Some(context);
            self.duplication = Some(duplication);
            self.output_size = (output_width, output_height);
        }
        Ok(())
    }

    fn register_zone(&mut self, region: CaptureRegion) -> CaptureResult<ZoneId> {
        let device = self.device.as_ref().ok_or_else(|| {
            CaptureError::ZoneRegistration("capture session not open".into())
        })?;
        let (out_w, out_h) = self.output_size;
        if region.is_empty()
            || region.x < 0
            || region.y < 0
            || region.x as u32 + region.width > out_w
            || region.y as u32 + region.height > out_h
        {
            return Err(CaptureError::ZoneRegistration(format!(
                "region {region:?} outside output bounds {out_w}x{out_h}"
            )));
        }

        let desc = D3D11_TEXTURE2D_DESC {
            Width: region.width,
            Height: region.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_B8G8R8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };
        let staging = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            device
                .CreateTexture2D(&desc, None, Some(&mut staging))
                .map_err(|err| {
                    CaptureError::ZoneRegistration(format!("CreateTexture2D: {err}"))
                })?;
            staging.ok_or_else(|| {
                CaptureError::ZoneRegistration("CreateTexture2D returned no texture".into())
            })?
        };

        self.zones.push(DxgiZone {
            region,
            staging,
            pixels: Mutex::new(vec![0; region.byte_len(PixelFormat::Bgra8)]),
        });
        Ok(ZoneId(self.zones.len() as u64 - 1))
    }

    fn capture_frame(&mut self) -> CaptureResult<()> {
        let duplication = self.duplication.as_ref().ok_or_else(|| {
            CaptureError::CaptureFailed("capture session not open".into())
        })?;
        let context = self.context.as_ref().ok_or_else(|| {
            CaptureError::CaptureFailed("capture session not open".into())
        })?;

        let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;
        unsafe {
            duplication.AcquireNextFrame(self.timeout_ms, &mut frame_info, &mut resource)
        }
        .map_err(|err| {
            if err.code() == DXGI_ERROR_WAIT_TIMEOUT {
                CaptureError::Timeout
            } else {
                CaptureError::CaptureFailed(format!("AcquireNextFrame: {err}"))
            }
        })?;

        // The frame must be released no matter how the zone copies fare.
        let result = self.copy_zones(context, resource);
        unsafe {
            let _ = duplication.ReleaseFrame();
        }
        result
    }

    fn read_zone(&mut self, zone: ZoneId, dest: &mut [u8]) -> CaptureResult<()> {
        let zone = self
            .zones
            .get(zone.0 as usize)
            .ok_or(CaptureError::UnknownZone)?;
        let pixels = zone.pixels.lock();
        let len = pixels.len().min(dest.len());
        dest[..len].copy_from_slice(&pixels[..len]);
        Ok(())
    }

    fn close(&mut self) {
        if self.duplication.is_some() {
            info!("DXGI output duplication closed");
        }
        self.zones.clear();
        self.duplication = None;
        self.context = None;
        self.device = None;
        self.output_size = (0, 0);
    }
}
