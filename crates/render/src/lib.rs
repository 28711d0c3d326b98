//! OCR 前的分页
//!
//! OCR 引擎只读单页图像，多页传真 TIFF 需逐帧解码，每一帧写到源文件旁边，
//! 命名为 `{stem}_{index}.{ext}`。分页由 [`PageSplitter`] 惰性产生。
//! 支持 CCITT Group 4 (Fax4) 压缩的二值传真。

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("TIFF 解码失败: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("图像处理错误: {0}")]
    Image(#[from] image::ImageError),
    #[error("不支持的页面格式: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// 分页输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    Png,
    Tiff,
}

impl PageFormat {
    fn extension(self) -> &'static str {
        match self {
            PageFormat::Png => "png",
            PageFormat::Tiff => "tif",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            PageFormat::Png => ImageFormat::Png,
            PageFormat::Tiff => ImageFormat::Tiff,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    pub format: PageFormat,
}

/// 分页文件名：源目录下的 `{stem}_{index}.{ext}`
pub fn page_path(source: &Path, index: usize, format: PageFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    source.with_file_name(format!("{}_{}.{}", stem, index, format.extension()))
}

/// 打开 `source`，返回按页惰性产出的迭代器
///
/// TIFF 逐帧遍历；image 能识别的其他格式只产出一页。解码错误作为迭代项返回。
pub fn split_pages(source: &Path, options: &RenderOptions) -> Result<PageSplitter> {
    let is_tiff = matches!(ImageFormat::from_path(source), Ok(ImageFormat::Tiff));

    let state = if is_tiff {
        let reader = BufReader::new(File::open(source)?);
        State::Tiff(Box::new(Decoder::new(reader)?))
    } else {
        if !source.exists() {
            return Err(RenderError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} 不存在", source.display()),
            )));
        }
        State::Single
    };

    log::debug!("[Render] 开始分页: {}", source.display());

    Ok(PageSplitter {
        source: source.to_path_buf(),
        format: options.format,
        index: 0,
        state,
    })
}

enum State {
    Tiff(Box<Decoder<BufReader<File>>>),
    Single,
    Done,
}

/// 已写出的分页文件，按页序
pub struct PageSplitter {
    source: PathBuf,
    format: PageFormat,
    index: usize,
    state: State,
}

impl PageSplitter {
    fn write_page(&self, page: &DynamicImage) -> Result<PathBuf> {
        let path = page_path(&self.source, self.index, self.format);
        page.save_with_format(&path, self.format.image_format())?;
        Ok(path)
    }

    fn next_page(&mut self) -> Option<Result<DynamicImage>> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Done => None,
            State::Single => Some(image::open(&self.source).map_err(RenderError::from)),
            State::Tiff(mut decoder) => {
                let page = decode_frame(&mut decoder);
                if page.is_ok() && decoder.more_images() {
                    match decoder.next_image() {
                        Ok(()) => self.state = State::Tiff(decoder),
                        Err(err) => {
                            log::warn!(
                                "[Render] {}: 无法越过第 {} 页: {}",
                                self.source.display(),
                                self.index,
                                err
                            );
                        }
                    }
                }
                Some(page)
            }
        }
    }
}

impl Iterator for PageSplitter {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = match self.next_page()? {
            Ok(page) => page,
            Err(err) => return Some(Err(err)),
        };
        let written = self.write_page(&page);
        self.index += 1;
        Some(written)
    }
}

fn decode_frame(decoder: &mut Decoder<BufReader<File>>) -> Result<DynamicImage> {
    let (width, height) = decoder.dimensions()?;
    let color = decoder.colortype()?;
    let data = decoder.read_image()?;
    frame_to_image(width, height, color, data)
}

fn frame_to_image(
    width: u32,
    height: u32,
    color: ColorType,
    data: DecodingResult,
) -> Result<DynamicImage> {
    let mismatch = || RenderError::Unsupported(format!("{:?} 缓冲区大小不符", color));

    let image = match (color, data) {
        (ColorType::Gray(1), DecodingResult::U8(buf)) => {
            DynamicImage::ImageLuma8(unpack_bilevel(width, height, &buf).ok_or_else(mismatch)?)
        }
        (ColorType::Gray(8), DecodingResult::U8(buf)) => {
            DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, buf).ok_or_else(mismatch)?)
        }
        (ColorType::Gray(16), DecodingResult::U16(buf)) => DynamicImage::ImageLuma16(
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, buf)
                .ok_or_else(mismatch)?,
        ),
        (ColorType::RGB(8), DecodingResult::U8(buf)) => {
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, buf).ok_or_else(mismatch)?)
        }
        (ColorType::RGBA(8), DecodingResult::U8(buf)) => {
            DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, buf).ok_or_else(mismatch)?)
        }
        (other, _) => return Err(RenderError::Unsupported(format!("{:?}", other))),
    };
    Ok(image)
}

/// 把 1 位行（高位在前，每行补齐到整字节）展开为 8 位灰度，1 为白
fn unpack_bilevel(width: u32, height: u32, packed: &[u8]) -> Option<GrayImage> {
    let (w, h) = (width as usize, height as usize);
    let row_bytes = (w + 7) / 8;
    if packed.len() < row_bytes * h {
        return None;
    }

    let mut pixels = Vec::with_capacity(w * h);
    for row in packed.chunks(row_bytes).take(h) {
        for x in 0..w {
            let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
            pixels.push(if bit == 1 { 255 } else { 0 });
        }
    }
    GrayImage::from_raw(width, height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_multipage_tiff(path: &Path, pages: u8) {
        let mut file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(&mut file).unwrap();
        for page in 0..pages {
            let data = vec![page * 40; 16 * 8];
            encoder
                .write_image::<colortype::Gray8>(16, 8, &data)
                .unwrap();
        }
    }

    #[test]
    fn test_split_multipage_tiff_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("20240101120000(0001).tif");
        write_multipage_tiff(&source, 3);

        let pages: Vec<PathBuf> = split_pages(&source, &RenderOptions::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(pages.len(), 3);
        for (index, page) in pages.iter().enumerate() {
            assert_eq!(page, &page_path(&source, index, PageFormat::Png));
            let img = image::open(page).unwrap();
            assert_eq!(img.dimensions(), (16, 8));
            assert_eq!(img.to_luma8().get_pixel(0, 0).0[0], index as u8 * 40);
        }
    }

    #[test]
    fn test_single_page_tiff_yields_one_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("fax.tif");
        write_multipage_tiff(&source, 1);

        let pages: Vec<_> = split_pages(&source, &RenderOptions::default())
            .unwrap()
            .collect();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].as_ref().unwrap().ends_with("fax_0.png"));
    }

    #[test]
    fn test_non_tiff_source_is_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.png");
        GrayImage::from_pixel(4, 4, Luma([9])).save(&source).unwrap();

        let options = RenderOptions {
            format: PageFormat::Tiff,
        };
        let pages: Vec<_> = split_pages(&source, &options).unwrap().collect();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].as_ref().unwrap().ends_with("scan_0.tif"));
    }

    fn ifd_entry(out: &mut Vec<u8>, tag: u16, kind: u16, value: u32) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        match kind {
            3 => {
                out.extend_from_slice(&(value as u16).to_le_bytes());
                out.extend_from_slice(&[0, 0]);
            }
            _ => out.extend_from_slice(&value.to_le_bytes()),
        }
    }

    /// 8x4 全白页，Compression=4，WhiteIsZero
    ///
    /// 参考行全白时每行只有一个 V0 码 `1`，四行为 `1111`，后接 EOFB (两个 EOL)。
    fn group4_blank_page() -> Vec<u8> {
        const SHORT: u16 = 3;
        const LONG: u16 = 4;
        let strip = [0xF0, 0x01, 0x00, 0x10];
        let entries: u16 = 9;
        let data_offset = 8 + 2 + 12 * entries as u32 + 4;

        let mut out = b"II".to_vec();
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&entries.to_le_bytes());
        ifd_entry(&mut out, 256, SHORT, 8);
        ifd_entry(&mut out, 257, SHORT, 4);
        ifd_entry(&mut out, 258, SHORT, 1);
        ifd_entry(&mut out, 259, SHORT, 4);
        ifd_entry(&mut out, 262, SHORT, 0);
        ifd_entry(&mut out, 273, LONG, data_offset);
        ifd_entry(&mut out, 277, SHORT, 1);
        ifd_entry(&mut out, 278, SHORT, 4);
        ifd_entry(&mut out, 279, LONG, strip.len() as u32);
        out.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(out.len() as u32, data_offset);
        out.extend_from_slice(&strip);
        out
    }

    #[test]
    fn test_group4_fax_page_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("20240101120000(0002).tif");
        std::fs::write(&source, group4_blank_page()).unwrap();

        let pages: Vec<PathBuf> = split_pages(&source, &RenderOptions::default())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(pages.len(), 1);

        let img = image::open(&pages[0]).unwrap().to_luma8();
        assert_eq!(img.dimensions(), (8, 4));
        let first = *img.get_pixel(0, 0);
        assert!(img.pixels().all(|p| *p == first));
    }

    #[test]
    fn test_corrupt_tiff_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.tif");
        std::fs::write(&source, b"not a tiff at all").unwrap();
        assert!(split_pages(&source, &RenderOptions::default()).is_err());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(split_pages(&dir.path().join("gone.tif"), &RenderOptions::default()).is_err());
        assert!(split_pages(&dir.path().join("gone.png"), &RenderOptions::default()).is_err());
    }

    #[test]
    fn test_unpack_bilevel() {
        // 宽 10 像素，每行两字节
        let packed = [0b1010_0000, 0b0100_0000, 0xFF, 0xC0];
        let img = unpack_bilevel(10, 2, &packed).unwrap();
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        assert_eq!(img.get_pixel(1, 0).0[0], 0);
        assert_eq!(img.get_pixel(9, 0).0[0], 255);
        assert_eq!(img.get_pixel(9, 1).0[0], 255);
        assert!(unpack_bilevel(10, 3, &packed).is_none());
    }
}
