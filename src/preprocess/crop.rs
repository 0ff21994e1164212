// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/preprocess/crop.rs - 按包围盒裁剪
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{Rgba, RgbaImage, imageops};
use thiserror::Error;

use super::BoundingBox;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CropError {
  #[error("包围盒无效: {0:?}")]
  InvalidBox(BoundingBox),
  #[error("包围盒 {bbox:?} 超出图像范围 {width}x{height}")]
  OutOfBounds {
    bbox: BoundingBox,
    width: u32,
    height: u32,
  },
}

/// 取出包围盒内的子图，宽 = max_x - min_x + 1，高 = max_y - min_y + 1
pub fn crop(image: &RgbaImage, bbox: &BoundingBox) -> Result<RgbaImage, CropError> {
  if !bbox.is_valid() {
    return Err(CropError::InvalidBox(*bbox));
  }

  let (width, height) = image.dimensions();
  if bbox.max_x >= width || bbox.max_y >= height {
    return Err(CropError::OutOfBounds {
      bbox: *bbox,
      width,
      height,
    });
  }

  Ok(imageops::crop_imm(image, bbox.min_x, bbox.min_y, bbox.width(), bbox.height()).to_image())
}

/// 把裁剪结果贴回 `width x height` 的背景上，位置由包围盒决定
pub fn restore_onto(
  cropped: &RgbaImage,
  bbox: &BoundingBox,
  width: u32,
  height: u32,
  background: Rgba<u8>,
) -> RgbaImage {
  let mut canvas = RgbaImage::from_pixel(width, height, background);
  imageops::replace(&mut canvas, cropped, bbox.min_x as i64, bbox.min_y as i64);
  canvas
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::preprocess::{InkRule, find_ink_bounds};

  const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

  #[test]
  fn single_pixel_crop() {
    let ink = Rgba([12, 34, 56, 255]);
    let mut image = RgbaImage::from_pixel(4, 4, WHITE);
    image.put_pixel(1, 1, ink);

    let bbox = find_ink_bounds(&image, InkRule::NonWhite).unwrap();
    let cropped = crop(&image, &bbox).unwrap();
    assert_eq!(cropped.dimensions(), (1, 1));
    assert_eq!(*cropped.get_pixel(0, 0), ink);
  }

  #[test]
  fn rejects_inverted_box() {
    let image = RgbaImage::from_pixel(4, 4, WHITE);
    // What a naive scan of a blank 4x4 canvas would produce.
    let inverted = BoundingBox::new(4, 4, 0, 0);
    assert_eq!(crop(&image, &inverted), Err(CropError::InvalidBox(inverted)));
  }

  #[test]
  fn rejects_box_outside_image() {
    let image = RgbaImage::from_pixel(4, 4, WHITE);
    let bbox = BoundingBox::new(2, 2, 4, 3);
    assert!(matches!(
      crop(&image, &bbox),
      Err(CropError::OutOfBounds { .. })
    ));
  }

  #[test]
  fn crop_then_restore_keeps_ink_positions() {
    let mut image = RgbaImage::from_pixel(20, 12, WHITE);
    let ink = [(3, 4), (9, 4), (6, 10), (15, 7)];
    for (i, (x, y)) in ink.iter().enumerate() {
      image.put_pixel(*x, *y, Rgba([i as u8 * 40, 0, 0, 255]));
    }

    let bbox = find_ink_bounds(&image, InkRule::NonWhite).unwrap();
    let cropped = crop(&image, &bbox).unwrap();
    for (x, y) in ink {
      assert_eq!(
        cropped.get_pixel(x - bbox.min_x, y - bbox.min_y),
        image.get_pixel(x, y)
      );
    }

    let restored = restore_onto(&cropped, &bbox, 20, 12, WHITE);
    assert_eq!(restored, image);
  }
}
