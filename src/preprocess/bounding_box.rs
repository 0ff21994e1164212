// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/preprocess/bounding_box.rs - 墨迹包围盒提取
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

use image::{Rgba, RgbaImage};

/// 近黑判定的默认容差
pub const DEFAULT_TOLERANCE: u8 = 10;

/// 墨迹像素判定规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InkRule {
  /// R、G、B 任一通道不等于 255 即为墨迹
  NonWhite,
  /// R、G、B 三个通道都小于容差才算墨迹
  NearBlack { tolerance: u8 },
}

impl InkRule {
  #[inline]
  pub fn is_ink(&self, pixel: &Rgba<u8>) -> bool {
    let [r, g, b, _] = pixel.0;
    match *self {
      InkRule::NonWhite => r != 255 || g != 255 || b != 255,
      InkRule::NearBlack { tolerance } => r < tolerance && g < tolerance && b < tolerance,
    }
  }
}

/// 闭区间包围盒 [min_x, max_x] x [min_y, max_y]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
  pub min_x: u32,
  pub min_y: u32,
  pub max_x: u32,
  pub max_y: u32,
}

impl BoundingBox {
  pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
    Self {
      min_x,
      min_y,
      max_x,
      max_y,
    }
  }

  /// 覆盖整张 `width x height` 图像的包围盒，要求宽高非零
  pub fn covering(width: u32, height: u32) -> Self {
    Self::new(0, 0, width.saturating_sub(1), height.saturating_sub(1))
  }

  pub fn is_valid(&self) -> bool {
    self.min_x <= self.max_x && self.min_y <= self.max_y
  }

  pub fn width(&self) -> u32 {
    self.max_x - self.min_x + 1
  }

  pub fn height(&self) -> u32 {
    self.max_y - self.min_y + 1
  }

  pub fn contains(&self, x: u32, y: u32) -> bool {
    (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
  }
}

/// 单次扫描全部像素，返回覆盖所有墨迹像素的最小包围盒；空白画布返回 `None`
pub fn find_ink_bounds(image: &RgbaImage, rule: InkRule) -> Option<BoundingBox> {
  let (width, height) = image.dimensions();
  let mut min_x = width;
  let mut min_y = height;
  let mut max_x = 0;
  let mut max_y = 0;
  let mut found = false;

  for (x, y, pixel) in image.enumerate_pixels() {
    if rule.is_ink(pixel) {
      found = true;
      min_x = min_x.min(x);
      max_x = max_x.max(x);
      min_y = min_y.min(y);
      max_y = max_y.max(y);
    }
  }

  found.then(|| BoundingBox::new(min_x, min_y, max_x, max_y))
}

#[cfg(test)]
mod tests {
  use super::*;

  const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
  const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

  #[test]
  fn single_pixel_at_one_one() {
    let mut image = RgbaImage::from_pixel(4, 4, WHITE);
    image.put_pixel(1, 1, BLACK);

    let bbox = find_ink_bounds(&image, InkRule::NonWhite).unwrap();
    assert_eq!(bbox, BoundingBox::new(1, 1, 1, 1));
    assert_eq!((bbox.width(), bbox.height()), (1, 1));
  }

  #[test]
  fn blank_image_has_no_box() {
    let image = RgbaImage::from_pixel(16, 9, WHITE);
    assert_eq!(find_ink_bounds(&image, InkRule::NonWhite), None);
    assert_eq!(
      find_ink_bounds(&image, InkRule::NearBlack { tolerance: 10 }),
      None
    );
  }

  #[test]
  fn box_is_ordered_for_scattered_ink() {
    let mut image = RgbaImage::from_pixel(50, 40, WHITE);
    let points = [(45, 3), (2, 38), (20, 20), (7, 0)];
    for (x, y) in points {
      image.put_pixel(x, y, BLACK);
    }

    let bbox = find_ink_bounds(&image, InkRule::NonWhite).unwrap();
    assert!(bbox.is_valid());
    assert_eq!(bbox, BoundingBox::new(2, 0, 45, 38));
    for (x, y) in points {
      assert!(bbox.contains(x, y));
    }
  }

  #[test]
  fn rules_disagree_on_anti_aliased_pixels() {
    let gray = Rgba([200, 200, 200, 255]);
    let near_black = Rgba([9, 3, 0, 255]);
    let rule = InkRule::NearBlack {
      tolerance: DEFAULT_TOLERANCE,
    };

    assert!(InkRule::NonWhite.is_ink(&gray));
    assert!(!rule.is_ink(&gray));
    assert!(rule.is_ink(&near_black));
    assert!(!rule.is_ink(&Rgba([10, 0, 0, 255])));
  }

  #[test]
  fn alpha_is_ignored() {
    assert!(!InkRule::NonWhite.is_ink(&Rgba([255, 255, 255, 0])));
  }
}
