// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::{Args, ValueEnum};

use crate::preprocess::{DEFAULT_TOLERANCE, GrayChannel, InkRule, PreprocessConfig};

/// 墨迹判定方式
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InkRuleKind {
  /// 任一通道不是 255 即为墨迹
  NonWhite,
  /// 三个通道都低于容差才算墨迹
  NearBlack,
}

/// 送入模型的单通道
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
  Red,
  Luma,
  Alpha,
}

/// 预处理参数
#[derive(Args, Debug, Clone)]
pub struct PreprocessArgs {
  /// 墨迹判定方式
  #[arg(long, value_enum, default_value_t = InkRuleKind::NonWhite)]
  pub ink_rule: InkRuleKind,

  /// near-black 判定的容差 (0 - 255)
  #[arg(long, default_value_t = DEFAULT_TOLERANCE, value_name = "TOLERANCE")]
  pub tolerance: u8,

  /// 单通道化时使用的通道
  #[arg(long, value_enum, default_value_t = ChannelKind::Red)]
  pub channel: ChannelKind,

  /// 不按包围盒裁剪，直接缩放整张画布
  #[arg(long)]
  pub no_crop: bool,
}

impl From<&PreprocessArgs> for PreprocessConfig {
  fn from(args: &PreprocessArgs) -> Self {
    let ink_rule = match args.ink_rule {
      InkRuleKind::NonWhite => InkRule::NonWhite,
      InkRuleKind::NearBlack => InkRule::NearBlack {
        tolerance: args.tolerance,
      },
    };
    let channel = match args.channel {
      ChannelKind::Red => GrayChannel::Red,
      ChannelKind::Luma => GrayChannel::Luma,
      ChannelKind::Alpha => GrayChannel::Alpha,
    };

    PreprocessConfig {
      ink_rule,
      channel,
      crop: !args.no_crop,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser, Debug)]
  struct TestArgs {
    #[command(flatten)]
    preprocess: PreprocessArgs,
  }

  #[test]
  fn defaults_match_preprocess_config() {
    let args = TestArgs::parse_from(["tuya"]);
    assert_eq!(PreprocessConfig::from(&args.preprocess), PreprocessConfig::default());
  }

  #[test]
  fn near_black_with_tolerance() {
    let args = TestArgs::parse_from([
      "tuya",
      "--ink-rule",
      "near-black",
      "--tolerance",
      "32",
      "--channel",
      "luma",
      "--no-crop",
    ]);
    let config = PreprocessConfig::from(&args.preprocess);
    assert_eq!(config.ink_rule, InkRule::NearBlack { tolerance: 32 });
    assert_eq!(config.channel, GrayChannel::Luma);
    assert!(!config.crop);
  }
}
