// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/preprocess/resize.rs - 单通道化、双线性缩放与归一化
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

use image::{GrayImage, Luma, RgbaImage, imageops};

use crate::frame::{FrameError, GrayNhwcTensor};

/// 单通道化时选取的通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrayChannel {
  /// 取 R 通道（即 RGBA 的第一个通道）
  #[default]
  Red,
  /// 按亮度公式合成灰度
  Luma,
  /// 取 Alpha 通道
  Alpha,
}

pub fn to_single_channel(image: &RgbaImage, channel: GrayChannel) -> GrayImage {
  match channel {
    GrayChannel::Red => GrayImage::from_fn(image.width(), image.height(), |x, y| {
      Luma([image.get_pixel(x, y)[0]])
    }),
    GrayChannel::Alpha => GrayImage::from_fn(image.width(), image.height(), |x, y| {
      Luma([image.get_pixel(x, y)[3]])
    }),
    GrayChannel::Luma => imageops::grayscale(image),
  }
}

/// 双线性缩放到 `out_w x out_h`，不对齐角点、不使用半像素中心：
/// 源坐标 = 目标坐标 * (输入尺寸 / 输出尺寸)，边界处取最后一行/列。
///
/// 返回行优先的浮点像素值（未归一化，范围仍为 [0, 255]）。
pub fn resize_bilinear(src: &GrayImage, out_w: u32, out_h: u32) -> Vec<f32> {
  let (in_w, in_h) = src.dimensions();
  let mut out = Vec::with_capacity(out_w as usize * out_h as usize);
  if in_w == 0 || in_h == 0 {
    out.resize(out_w as usize * out_h as usize, 0.0);
    return out;
  }

  let scale_x = in_w as f64 / out_w as f64;
  let scale_y = in_h as f64 / out_h as f64;
  let pixel = |x: u32, y: u32| src.get_pixel(x, y)[0] as f64;

  for oy in 0..out_h {
    let sy = oy as f64 * scale_y;
    let top = (sy.floor() as u32).min(in_h - 1);
    let bottom = (sy.ceil() as u32).min(in_h - 1);
    let dy = sy - top as f64;

    for ox in 0..out_w {
      let sx = ox as f64 * scale_x;
      let left = (sx.floor() as u32).min(in_w - 1);
      let right = (sx.ceil() as u32).min(in_w - 1);
      let dx = sx - left as f64;

      let top_value = pixel(left, top) + (pixel(right, top) - pixel(left, top)) * dx;
      let bottom_value = pixel(left, bottom) + (pixel(right, bottom) - pixel(left, bottom)) * dx;
      let value = top_value + (bottom_value - top_value) * dy;
      out.push(value as f32);
    }
  }

  out
}

/// 单通道化、缩放到 `W x H` 并除以 255，得到 (1, H, W, 1) 张量
pub fn normalize<const W: u32, const H: u32>(
  image: &RgbaImage,
  channel: GrayChannel,
) -> Result<GrayNhwcTensor<W, H>, FrameError> {
  let gray = to_single_channel(image, channel);
  let data = resize_bilinear(&gray, W, H)
    .into_iter()
    .map(|v| v / 255.0)
    .collect::<Vec<_>>();
  GrayNhwcTensor::try_from(data)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::AsNhwcTensor;
  use image::Rgba;

  fn gradient(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]))
  }

  #[test]
  fn same_size_resize_is_identity() {
    let src = gradient(256, 256);
    let out = resize_bilinear(&src, 256, 256);
    for (value, pixel) in out.iter().zip(src.pixels()) {
      assert!((value - pixel[0] as f32).abs() < 1e-4);
    }
  }

  #[test]
  fn upscale_interpolates_between_neighbours() {
    let src = GrayImage::from_raw(2, 1, vec![0, 200]).unwrap();
    let out = resize_bilinear(&src, 4, 1);
    // Source x = 0, 0.5, 1.0, 1.5 (clamped to the last column).
    assert_eq!(out, vec![0.0, 100.0, 200.0, 200.0]);
  }

  #[test]
  fn downscale_samples_top_left_aligned_grid() {
    let src = GrayImage::from_raw(4, 1, vec![10, 20, 30, 40]).unwrap();
    let out = resize_bilinear(&src, 2, 1);
    assert_eq!(out, vec![10.0, 30.0]);
  }

  #[test]
  fn deterministic_for_identical_input() {
    let src = gradient(37, 53);
    assert_eq!(resize_bilinear(&src, 256, 256), resize_bilinear(&src, 256, 256));
  }

  #[test]
  fn channel_selection() {
    let image = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 40]));
    assert_eq!(to_single_channel(&image, GrayChannel::Red)[(0, 0)], Luma([10]));
    assert_eq!(to_single_channel(&image, GrayChannel::Alpha)[(0, 0)], Luma([40]));

    let white = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
    assert_eq!(to_single_channel(&white, GrayChannel::Luma)[(0, 0)], Luma([255]));
  }

  #[test]
  fn normalize_scales_into_unit_range() {
    let mut image = RgbaImage::from_pixel(3, 5, Rgba([255, 255, 255, 255]));
    image.put_pixel(1, 2, Rgba([0, 0, 0, 255]));

    let tensor = normalize::<256, 256>(&image, GrayChannel::Red).unwrap();
    assert_eq!(tensor.shape(), [1, 256, 256, 1]);
    assert!(tensor.as_nhwc().iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(tensor.get(0, 0), Some(1.0));
  }
}
