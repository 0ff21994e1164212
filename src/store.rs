// 该文件是 Tuya （涂鸦） 项目的一部分。
// src/store.rs - 预测结果的发布/订阅单元
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

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::debug;

use crate::model::PredictionVector;

/// 单写者、多读者的当前值，默认存放预测向量。
///
/// 新订阅者会立即收到当前值，之后每次发布都会收到新值；
/// 已断开的订阅者在下一次发布时被移除。
pub struct PredictionStore<T = PredictionVector> {
  current: T,
  subscribers: Vec<Sender<T>>,
}

impl Default for PredictionStore {
  fn default() -> Self {
    Self::new()
  }
}

impl PredictionStore {
  pub fn new() -> Self {
    Self::with_initial(PredictionVector::ZERO)
  }
}

impl<T: Clone> PredictionStore<T> {
  pub fn with_initial(initial: T) -> Self {
    Self {
      current: initial,
      subscribers: Vec::new(),
    }
  }

  pub fn current(&self) -> &T {
    &self.current
  }

  pub fn subscribe(&mut self) -> Receiver<T> {
    let (tx, rx) = mpsc::channel();
    // 接收端刚创建，不会失败
    let _ = tx.send(self.current.clone());
    self.subscribers.push(tx);
    rx
  }

  pub fn publish(&mut self, value: T) {
    let before = self.subscribers.len();
    self.subscribers.retain(|tx| tx.send(value.clone()).is_ok());
    self.current = value;
    let dropped = before - self.subscribers.len();
    if dropped > 0 {
      debug!("移除 {} 个已断开的订阅者", dropped);
    }
  }

  pub fn subscriber_count(&self) -> usize {
    self.subscribers.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_at_zero_and_replays_current_to_new_subscribers() {
    let mut store = PredictionStore::new();
    assert_eq!(*store.current(), PredictionVector::ZERO);

    let early = store.subscribe();
    assert_eq!(early.try_recv().unwrap(), PredictionVector::ZERO);

    let prediction = PredictionVector::new([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    store.publish(prediction);
    assert_eq!(early.try_recv().unwrap(), prediction);

    let late = store.subscribe();
    assert_eq!(late.try_recv().unwrap(), prediction);
    assert!(late.try_recv().is_err());
  }

  #[test]
  fn every_reader_sees_every_update() {
    let mut store = PredictionStore::new();
    let a = store.subscribe();
    let b = store.subscribe();

    let first = PredictionVector::new([10; 10]);
    store.publish(first);
    store.publish(PredictionVector::ZERO);

    for rx in [a, b] {
      let seen: Vec<_> = rx.try_iter().collect();
      assert_eq!(seen, vec![PredictionVector::ZERO, first, PredictionVector::ZERO]);
    }
  }

  #[test]
  fn dropped_readers_are_pruned() {
    let mut store = PredictionStore::new();
    let kept = store.subscribe();
    drop(store.subscribe());
    assert_eq!(store.subscriber_count(), 2);

    store.publish(PredictionVector::new([5; 10]));
    assert_eq!(store.subscriber_count(), 1);
    assert_eq!(kept.try_iter().count(), 2);
  }

  #[test]
  fn holds_any_cloneable_value() {
    let mut store = PredictionStore::with_initial(String::from("空白"));
    let rx = store.subscribe();
    store.publish(String::from("猫"));
    assert_eq!(store.current(), "猫");
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["空白", "猫"]);
  }
}
