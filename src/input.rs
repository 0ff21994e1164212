// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/input.rs - 草图输入
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

use image::RgbaImage;
use thiserror::Error;

use crate::FromUrl;

#[cfg(not(any(feature = "read_image_file", feature = "stroke_script")))]
compile_error!("至少需要启用一个输入特性: read_image_file 或 stroke_script");

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "stroke_script")]
mod stroke_script;
#[cfg(feature = "stroke_script")]
pub use self::stroke_script::{
  PointerEvent, ScriptCanvas, ScriptEvent, ScriptViewport, StrokeScript, StrokeScriptInput,
  StrokeScriptInputError,
};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "stroke_script")]
  #[error("Stroke script input error: {0}")]
  StrokeScriptInputError(#[from] StrokeScriptInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

/// 按 URL 方案选择的草图来源，每一项是一张白底 RGBA 画布快照
pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "stroke_script")]
  StrokeScript(StrokeScriptInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    #[cfg(feature = "stroke_script")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == StrokeScriptInput::SCHEME {
        let input = StrokeScriptInput::from_url(url)?;
        return Ok(InputWrapper::StrokeScript(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = RgbaImage;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next(),
      #[cfg(feature = "stroke_script")]
      InputWrapper::StrokeScript(input) => input.next(),
    }
  }
}
