//! Environment maps
//!
//! Equirectangular panoramas used as the visible background and as the
//! reflection source for model materials. The decoder is picked from the
//! file extension. Anything that cannot be decoded is replaced by a
//! procedural gradient so a zone always has an environment.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;
use tracing::{debug, info};

use crate::rasterizer::{Color, Light, Texture, Vec3};
use crate::rasterizer::types::srgb_to_linear;
use super::error::{AssetError, AssetResult};

/// Widest background panorama kept after prefiltering
pub const MAX_BACKGROUND_WIDTH: usize = 1024;

/// Reflection map size
pub const REFLECTION_SIZE: (usize, usize) = (64, 32);

/// Fallback gradient size
pub const FALLBACK_SIZE: (usize, usize) = (1024, 512);

const FALLBACK_TOP: Color = Color::from_hex(0x8888ff);
const FALLBACK_BOTTOM: Color = Color::from_hex(0x000033);
const FALLBACK_SKY: Color = Color::from_hex(0x87ceeb);
const HEMISPHERE_SKY: Color = Color::from_hex(0x88ccff);
const HEMISPHERE_GROUND: Color = Color::from_hex(0x444444);
const HEMISPHERE_INTENSITY: f32 = 0.5;

/// Read chunk size for progress reporting
const READ_CHUNK: usize = 64 * 1024;

/// What the camera sees behind the scene
#[derive(Debug, Clone)]
pub enum Background {
    Panorama(Arc<Texture>),
    Solid(Color),
}

/// Decoded and prefiltered environment
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub background: Background,
    /// Low-resolution panorama for material reflections
    pub reflection: Arc<Texture>,
    /// Extra light installed with the fallback
    pub hemisphere: Option<Light>,
    pub is_fallback: bool,
}

/// Pick a decoder from the file extension
pub fn format_for_path(path: &Path) -> AssetResult<ImageFormat> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "hdr" => Ok(ImageFormat::Hdr),
        "exr" => Ok(ImageFormat::OpenExr),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        _ => Err(AssetError::UnsupportedFormat(if ext.is_empty() {
            path.display().to_string()
        } else {
            ext
        })),
    }
}

/// Read a whole file, reporting the fraction read after every chunk
pub fn read_with_progress(path: &Path, mut on_progress: impl FnMut(f32)) -> AssetResult<Vec<u8>> {
    let io_err = |source| AssetError::Io { path: path.to_path_buf(), source };
    let mut file = File::open(path).map_err(io_err)?;
    let total = file.metadata().map_err(io_err)?.len() as usize;

    let mut bytes = Vec::with_capacity(total);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut chunk).map_err(io_err)?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        if total > 0 {
            on_progress((bytes.len() as f32 / total as f32).min(1.0));
        }
    }
    Ok(bytes)
}

/// Decode panorama bytes to linear texels
pub fn decode_panorama(bytes: &[u8], format: ImageFormat) -> AssetResult<Texture> {
    let img = image::load_from_memory_with_format(bytes, format)?;
    let rgb = img.to_rgb32f();
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    if w == 0 || h == 0 {
        return Err(AssetError::Decode("empty panorama".into()));
    }

    // 8-bit formats are sRGB encoded; HDR and EXR are already linear
    let encoded = matches!(format, ImageFormat::Png | ImageFormat::Jpeg);
    let texels = rgb
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            if encoded {
                Vec3::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b))
            } else {
                Vec3::new(r.max(0.0), g.max(0.0), b.max(0.0))
            }
        })
        .collect();
    Ok(Texture::from_texels(w, h, texels))
}

/// Box-filter a texture down to `w` x `h`. Never upsamples.
pub fn downsample(src: &Texture, w: usize, h: usize) -> Texture {
    let w = w.clamp(1, src.width.max(1));
    let h = h.clamp(1, src.height.max(1));
    if w == src.width && h == src.height {
        return src.clone();
    }

    let mut texels = Vec::with_capacity(w * h);
    for y in 0..h {
        let y0 = y * src.height / h;
        let y1 = ((y + 1) * src.height / h).max(y0 + 1);
        for x in 0..w {
            let x0 = x * src.width / w;
            let x1 = ((x + 1) * src.width / w).max(x0 + 1);
            let mut sum = Vec3::ZERO;
            for sy in y0..y1 {
                for sx in x0..x1 {
                    sum = sum + src.get(sx, sy);
                }
            }
            texels.push(sum * (1.0 / ((x1 - x0) * (y1 - y0)) as f32));
        }
    }
    Texture::from_texels(w, h, texels)
}

/// Background at most `MAX_BACKGROUND_WIDTH` wide plus the small reflection map
pub fn prefilter(panorama: Texture) -> (Texture, Texture) {
    let reflection = downsample(&panorama, REFLECTION_SIZE.0, REFLECTION_SIZE.1);
    let background = if panorama.width > MAX_BACKGROUND_WIDTH {
        let h = (panorama.height * MAX_BACKGROUND_WIDTH / panorama.width).max(1);
        downsample(&panorama, MAX_BACKGROUND_WIDTH, h)
    } else {
        panorama
    };
    (background, reflection)
}

/// Decode and prefilter an environment from bytes
pub fn environment_from_bytes(bytes: &[u8], format: ImageFormat) -> AssetResult<EnvironmentMap> {
    let panorama = decode_panorama(bytes, format)?;
    debug!("panorama decoded: {}x{}", panorama.width, panorama.height);
    let (background, reflection) = prefilter(panorama);
    Ok(EnvironmentMap {
        background: Background::Panorama(Arc::new(background)),
        reflection: Arc::new(reflection),
        hemisphere: None,
        is_fallback: false,
    })
}

/// Read, decode and prefilter an environment map. Progress covers reading
/// (0.0..0.9) then decoding (1.0).
pub fn load_environment(path: &Path, mut on_progress: impl FnMut(f32)) -> AssetResult<EnvironmentMap> {
    let format = format_for_path(path)?;
    info!("loading environment {}", path.display());
    let bytes = read_with_progress(path, |f| on_progress(f * 0.9))?;
    let env = environment_from_bytes(&bytes, format)?;
    on_progress(1.0);
    Ok(env)
}

/// Vertical gradient reflection source, sky-blue background and a
/// hemisphere light
pub fn fallback_environment() -> EnvironmentMap {
    let (w, h) = FALLBACK_SIZE;
    let mut texels = Vec::with_capacity(w * h);
    for y in 0..h {
        let t = y as f32 / (h - 1) as f32;
        let c = FALLBACK_TOP.lerp(FALLBACK_BOTTOM, t).to_linear();
        texels.extend(std::iter::repeat(c).take(w));
    }
    let gradient = Texture::from_texels(w, h, texels);
    let reflection = downsample(&gradient, REFLECTION_SIZE.0, REFLECTION_SIZE.1);

    EnvironmentMap {
        background: Background::Solid(FALLBACK_SKY),
        reflection: Arc::new(reflection),
        hemisphere: Some(Light::Hemisphere {
            sky: HEMISPHERE_SKY.to_linear(),
            ground: HEMISPHERE_GROUND.to_linear(),
            intensity: HEMISPHERE_INTENSITY,
        }),
        is_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_dispatch() {
        assert_eq!(format_for_path(Path::new("a/b.hdr")).ok(), Some(ImageFormat::Hdr));
        assert_eq!(format_for_path(Path::new("b.EXR")).ok(), Some(ImageFormat::OpenExr));
        assert_eq!(format_for_path(Path::new("b.jpeg")).ok(), Some(ImageFormat::Jpeg));
        assert_eq!(format_for_path(Path::new("b.jpg")).ok(), Some(ImageFormat::Jpeg));
        assert_eq!(format_for_path(Path::new("b.png")).ok(), Some(ImageFormat::Png));
    }

    #[test]
    fn test_tga_is_unsupported() {
        match format_for_path(Path::new("sky.tga")) {
            Err(AssetError::UnsupportedFormat(ext)) => assert_eq!(ext, "tga"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_downsample_averages_blocks() {
        let src = Texture::from_texels(
            4,
            2,
            vec![
                Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Vec3::ZERO,
                Vec3::ONE, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO,
            ],
        );
        let out = downsample(&src, 2, 1);
        assert!((out.get(0, 0).x - 0.5).abs() < 0.001);
        assert!(out.get(1, 0).x.abs() < 0.001);
    }

    #[test]
    fn test_prefilter_caps_background_width() {
        let pano = Texture::new(2048, 1024, Vec3::ONE);
        let (bg, refl) = prefilter(pano);
        assert_eq!((bg.width, bg.height), (1024, 512));
        assert_eq!((refl.width, refl.height), REFLECTION_SIZE);
    }

    #[test]
    fn test_fallback_gradient_runs_top_to_bottom() {
        let env = fallback_environment();
        assert!(env.is_fallback);
        assert!(env.hemisphere.is_some());
        assert!(matches!(env.background, Background::Solid(c) if c == Color::from_hex(0x87ceeb)));
        let top = env.reflection.get(0, 0);
        let bottom = env.reflection.get(0, REFLECTION_SIZE.1 - 1);
        assert!(top.z > bottom.z);
    }

    #[test]
    fn test_load_png_panorama() {
        let mut img = image::RgbImage::new(8, 4);
        for p in img.pixels_mut() {
            *p = image::Rgb([255, 128, 0]);
        }
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sky.png");
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(&bytes))
            .expect("write png");

        let mut reports = Vec::new();
        let env = load_environment(&path, |p| reports.push(p)).expect("load");
        assert!(!env.is_fallback);
        assert_eq!(reports.last().copied(), Some(1.0));
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        let Background::Panorama(bg) = &env.background else {
            panic!("expected panorama background");
        };
        assert!((bg.get(0, 0).x - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_environment(Path::new("/nonexistent/sky.hdr"), |_| {});
        assert!(matches!(result, Err(AssetError::Io { .. })));
    }
}
