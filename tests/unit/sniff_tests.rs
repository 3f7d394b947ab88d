// Content sniffing and negotiation tests against real encoded images

use bytes::Bytes;
use image::codecs::gif::GifEncoder;
use image::{DynamicImage, Frame, ImageOutputFormat, RgbaImage};
use optimg::image_optimizer::{
    detect_content_type, detect_signature, is_animated, negotiate, ImageCodec, ImageMime,
    NativeCodec,
};
use std::io::Cursor;
use std::sync::Arc;

fn codec() -> Arc<dyn ImageCodec> {
    Arc::new(NativeCodec)
}

fn encode(format: ImageOutputFormat) -> Bytes {
    let img = RgbaImage::from_fn(16, 12, |x, y| image::Rgba([(x * 10) as u8, (y * 10) as u8, 90, 255]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buffer, format)
        .unwrap();
    Bytes::from(buffer.into_inner())
}

fn gif(frames: usize) -> Bytes {
    let mut data = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut data);
        let frames = (0..frames).map(|i| {
            Frame::new(RgbaImage::from_pixel(8, 8, image::Rgba([i as u8 * 60, 0, 0, 255])))
        });
        encoder.encode_frames(frames).unwrap();
    }
    Bytes::from(data)
}

#[tokio::test]
async fn test_detects_real_images() {
    assert_eq!(
        detect_content_type(&encode(ImageOutputFormat::Png), codec()).await,
        Some(ImageMime::Png)
    );
    assert_eq!(
        detect_content_type(&encode(ImageOutputFormat::Jpeg(80)), codec()).await,
        Some(ImageMime::Jpeg)
    );
    assert_eq!(
        detect_content_type(&encode(ImageOutputFormat::Tiff), codec()).await,
        Some(ImageMime::Tiff)
    );
    assert_eq!(detect_content_type(&gif(1), codec()).await, Some(ImageMime::Gif));
}

#[tokio::test]
async fn test_undetected_inputs() {
    assert_eq!(detect_content_type(&Bytes::new(), codec()).await, None);
    assert_eq!(
        detect_content_type(&Bytes::from_static(b"%PDF-1.7 not an image"), codec()).await,
        None
    );
    let noise: Vec<u8> = (0..256u32).map(|i| (i * 37 % 251) as u8 + 3).collect();
    assert_eq!(detect_signature(&noise), None);
    assert_eq!(detect_content_type(&Bytes::from(noise), codec()).await, None);
}

#[tokio::test]
async fn test_animated_gif_is_detected() {
    assert!(is_animated(&gif(3), ImageMime::Gif, codec()).await);
    assert!(!is_animated(&gif(1), ImageMime::Gif, codec()).await);
}

#[tokio::test]
async fn test_still_png_is_not_animated() {
    assert!(!is_animated(&encode(ImageOutputFormat::Png), ImageMime::Png, codec()).await);
}

#[tokio::test]
async fn test_non_animatable_type_is_not_probed() {
    // Garbage bytes would fail a probe; JPEG is never probed for frames
    assert!(!is_animated(&Bytes::from_static(b"junk"), ImageMime::Jpeg, codec()).await);
}

#[test]
fn test_negotiation_uses_server_priority() {
    let formats = [ImageMime::Avif, ImageMime::Webp];
    assert_eq!(
        negotiate(&formats, Some("image/webp;q=0.9,image/avif;q=0.5")),
        Some(ImageMime::Avif)
    );
    assert_eq!(negotiate(&formats, Some("text/html")), None);
    assert_eq!(negotiate(&formats, Some("image/*")), Some(ImageMime::Avif));
    assert_eq!(negotiate(&formats, Some("")), None);
    assert_eq!(negotiate(&[ImageMime::Webp], Some("image/avif,image/webp")), Some(ImageMime::Webp));
}
