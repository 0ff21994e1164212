// 该文件是 Tuya （涂鸦） 项目的一部分。
// tests/pipeline.rs - 预处理与会话的端到端测试
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

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use tuya::{
  canvas::{BACKGROUND, Canvas, Point},
  frame::{AsNhwcTensor, ModelInput},
  input::{ImageFileInput, StrokeScript},
  model::{Model, ModelError, PredictionVector},
  output::Render,
  preprocess::{
    BoundingBox, GrayChannel, InkRule, Preprocessed, Preprocessor, crop, find_ink_bounds,
    normalize, restore_onto,
  },
  session::{ReplyOutcome, Session, StrokeOutcome},
  task::{OneShotTask, ReplayTask, Task},
};

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const RAW: [f32; 10] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// 返回固定输出并记录调用次数的模型
struct FakeModel {
  calls: Arc<AtomicUsize>,
  delay: Duration,
}

impl FakeModel {
  fn new(calls: &Arc<AtomicUsize>) -> Self {
    Self {
      calls: calls.clone(),
      delay: Duration::ZERO,
    }
  }

  fn slow(calls: &Arc<AtomicUsize>, delay: Duration) -> Self {
    Self {
      calls: calls.clone(),
      delay,
    }
  }
}

impl Model for FakeModel {
  type Input = ModelInput;
  type Output = PredictionVector;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    assert_eq!(input.shape(), [1, 256, 256, 1]);
    assert!(input.as_nhwc().iter().all(|v| (0.0..=1.0).contains(v)));
    self.calls.fetch_add(1, Ordering::SeqCst);
    if !self.delay.is_zero() {
      thread::sleep(self.delay);
    }
    Self::postprocess(&RAW)
  }

  fn postprocess(output: &[f32]) -> Result<Self::Output, Self::Error> {
    PredictionVector::from_raw(output)
  }
}

/// 记录每次渲染的画面与结果
#[derive(Clone, Default)]
struct Recorder {
  results: Arc<Mutex<Vec<(RgbaImage, PredictionVector)>>>,
}

impl Recorder {
  fn results(&self) -> Vec<PredictionVector> {
    self.results.lock().unwrap().iter().map(|(_, r)| *r).collect()
  }

  fn frames(&self) -> Vec<RgbaImage> {
    self
      .results
      .lock()
      .unwrap()
      .iter()
      .map(|(f, _)| f.clone())
      .collect()
  }
}

impl Render<RgbaImage, PredictionVector> for Recorder {
  type Error = Infallible;

  fn render_result(&self, frame: &RgbaImage, result: &PredictionVector) -> Result<(), Self::Error> {
    self.results.lock().unwrap().push((frame.clone(), *result));
    Ok(())
  }
}

fn expected() -> PredictionVector {
  PredictionVector::new([10, 20, 30, 40, 50, 60, 70, 80, 90, 100])
}

fn sketch(width: u32, height: u32, ink: &[(u32, u32)]) -> RgbaImage {
  let mut image = RgbaImage::from_pixel(width, height, BACKGROUND);
  for &(x, y) in ink {
    image.put_pixel(x, y, INK);
  }
  image
}

#[test]
fn single_ink_pixel_is_boxed_and_cropped() {
  let image = sketch(4, 4, &[(1, 1)]);

  let bbox = find_ink_bounds(&image, InkRule::NonWhite).unwrap();
  assert_eq!(bbox, BoundingBox::new(1, 1, 1, 1));

  let cropped = crop(&image, &bbox).unwrap();
  assert_eq!(cropped.dimensions(), (1, 1));
  assert_eq!(*cropped.get_pixel(0, 0), INK);
}

#[test]
fn non_blank_boxes_are_ordered() {
  let image = sketch(50, 40, &[(30, 5), (4, 33), (17, 20)]);
  for rule in [InkRule::NonWhite, InkRule::NearBlack { tolerance: 10 }] {
    let bbox = find_ink_bounds(&image, rule).unwrap();
    assert!(bbox.min_x <= bbox.max_x && bbox.min_y <= bbox.max_y);
    assert_eq!(bbox, BoundingBox::new(4, 5, 30, 33));
  }
}

#[test]
fn crop_then_restore_keeps_ink_in_place() {
  let ink = [(7, 3), (12, 9), (9, 14)];
  let image = sketch(20, 20, &ink);

  let bbox = find_ink_bounds(&image, InkRule::NonWhite).unwrap();
  let cropped = crop(&image, &bbox).unwrap();
  for &(x, y) in &ink {
    assert_eq!(*cropped.get_pixel(x - bbox.min_x, y - bbox.min_y), INK);
  }
  assert_eq!(restore_onto(&cropped, &bbox, 20, 20, BACKGROUND), image);
}

#[test]
fn full_size_resize_is_identity() {
  let mut image = RgbaImage::from_pixel(256, 256, BACKGROUND);
  for i in 0..256 {
    image.put_pixel(i, (i * 7) % 256, Rgba([i as u8, 0, 0, 255]));
  }

  let tensor: ModelInput = normalize(&image, GrayChannel::Red).unwrap();
  for (x, y, pixel) in image.enumerate_pixels() {
    assert_eq!(tensor.get(x, y), Some(pixel[0] as f32 / 255.0));
  }
}

#[test]
fn blank_canvas_predicts_zero_without_model() {
  let calls = Arc::new(AtomicUsize::new(0));
  let recorder = Recorder::default();

  let input = ImageFileInput::from(sketch(64, 64, &[]));
  OneShotTask::default()
    .run_task(input, FakeModel::new(&calls), recorder.clone())
    .unwrap();

  assert_eq!(recorder.results(), vec![PredictionVector::ZERO]);
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn oneshot_scales_model_output() {
  let calls = Arc::new(AtomicUsize::new(0));
  let recorder = Recorder::default();

  let input = ImageFileInput::from(sketch(64, 64, &[(10, 10), (40, 50)]));
  OneShotTask::default()
    .run_task(input, FakeModel::new(&calls), recorder.clone())
    .unwrap();

  assert_eq!(recorder.results(), vec![expected()]);
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn preprocessor_short_circuits_blank_canvas() {
  let preprocessor = Preprocessor::default();
  assert!(
    preprocessor
      .run(&sketch(32, 32, &[]))
      .unwrap()
      .is_blank()
  );
  assert!(matches!(
    preprocessor.run(&sketch(32, 32, &[(3, 4)])).unwrap(),
    Preprocessed::Ready { region, .. } if region == BoundingBox::new(3, 4, 3, 4)
  ));
}

#[test]
fn clear_discards_in_flight_inference() {
  let calls = Arc::new(AtomicUsize::new(0));
  let model = FakeModel::new(&calls);
  let mut session = Session::new(Canvas::new(40, 40).unwrap(), Preprocessor::default());
  session.set_model_status(tuya::session::ModelStatus::Ready);
  let updates = session.subscribe();

  session.pointer_down(Point::new(5.0, 5.0));
  session.pointer_move(Point::new(30.0, 25.0));
  let StrokeOutcome::Request(request) = session.pointer_up().unwrap() else {
    panic!("expected an inference request");
  };

  // 推理还没回来就清空画布
  session.clear();
  let reply = request.run(&model);
  assert_eq!(session.complete(reply), ReplyOutcome::Stale);

  assert_eq!(session.current(), PredictionVector::ZERO);
  let published: Vec<_> = updates.try_iter().map(|u| u.prediction).collect();
  assert_eq!(published.last(), Some(&PredictionVector::ZERO));
  assert!(!published.contains(&expected()));
}

#[test]
fn newer_stroke_wins_over_older_reply() {
  let calls = Arc::new(AtomicUsize::new(0));
  let model = FakeModel::new(&calls);
  let mut session = Session::new(Canvas::new(40, 40).unwrap(), Preprocessor::default());
  session.set_model_status(tuya::session::ModelStatus::Ready);

  session.pointer_down(Point::new(5.0, 5.0));
  session.pointer_move(Point::new(10.0, 10.0));
  let StrokeOutcome::Request(first) = session.pointer_up().unwrap() else {
    panic!("expected an inference request");
  };
  session.pointer_down(Point::new(20.0, 20.0));
  session.pointer_move(Point::new(30.0, 30.0));
  let StrokeOutcome::Request(second) = session.pointer_up().unwrap() else {
    panic!("expected an inference request");
  };

  assert!(matches!(
    session.complete(second.run(&model)),
    ReplyOutcome::Applied(_)
  ));
  assert_eq!(session.complete(first.run(&model)), ReplyOutcome::Stale);
  assert_eq!(session.current(), expected());
}

const STROKE_THEN_CLEAR: &str = r#"{
  "canvas": { "width": 64, "height": 64 },
  "events": [
    { "type": "down", "x": 10, "y": 10 },
    { "type": "move", "x": 50, "y": 40 },
    { "type": "up" },
    { "type": "clear" }
  ]
}"#;

const SINGLE_STROKE: &str = r#"{
  "canvas": { "width": 64, "height": 64 },
  "events": [
    { "type": "down", "x": 10, "y": 10 },
    { "type": "move", "x": 50, "y": 40 },
    { "type": "up" }
  ]
}"#;

#[test]
fn replay_publishes_model_result() {
  let calls = Arc::new(AtomicUsize::new(0));
  let recorder = Recorder::default();
  let script = StrokeScript::from_json(SINGLE_STROKE).unwrap();

  let loader_calls = calls.clone();
  ReplayTask::default()
    .run_task(
      script,
      move || Ok::<_, ModelError>(FakeModel::new(&loader_calls)),
      recorder.clone(),
    )
    .unwrap();

  assert_eq!(recorder.results(), vec![expected()]);
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn replay_clear_beats_slow_inference() {
  let calls = Arc::new(AtomicUsize::new(0));
  let recorder = Recorder::default();
  let script = StrokeScript::from_json(STROKE_THEN_CLEAR).unwrap();

  let loader_calls = calls.clone();
  ReplayTask::default()
    .run_task(
      script,
      move || {
        Ok::<_, ModelError>(FakeModel::slow(
          &loader_calls,
          Duration::from_millis(300),
        ))
      },
      recorder.clone(),
    )
    .unwrap();

  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert_eq!(recorder.results(), vec![PredictionVector::ZERO]);
}

const STROKE_THEN_UNFINISHED_STROKE: &str = r#"{
  "canvas": { "width": 64, "height": 64 },
  "events": [
    { "type": "down", "x": 10, "y": 10 },
    { "type": "move", "x": 50, "y": 40 },
    { "type": "up" },
    { "type": "down", "x": 5, "y": 60 },
    { "type": "move", "x": 60, "y": 60 }
  ]
}"#;

#[test]
fn replay_renders_result_with_the_stroke_it_came_from() {
  let calls = Arc::new(AtomicUsize::new(0));
  let recorder = Recorder::default();
  let script = StrokeScript::from_json(STROKE_THEN_UNFINISHED_STROKE).unwrap();

  let loader_calls = calls.clone();
  ReplayTask::default()
    .run_task(
      script,
      move || {
        Ok::<_, ModelError>(FakeModel::slow(
          &loader_calls,
          Duration::from_millis(200),
        ))
      },
      recorder.clone(),
    )
    .unwrap();

  // 结果返回时画布上已有第二笔，但渲染的仍是第一笔抬起时的快照
  let first_stroke = StrokeScript::from_json(SINGLE_STROKE)
    .unwrap()
    .render()
    .unwrap();
  assert_eq!(recorder.results(), vec![expected()]);
  assert_eq!(recorder.frames(), vec![first_stroke]);
}

#[test]
fn replay_without_model_skips_inference() {
  let recorder = Recorder::default();
  let script = StrokeScript::from_json(SINGLE_STROKE).unwrap();

  ReplayTask::default()
    .run_task(
      script,
      || {
        Err::<FakeModel, _>(ModelError::OutputShape {
          expected: 10,
          actual: 0,
        })
      },
      recorder.clone(),
    )
    .unwrap();

  assert!(recorder.results().is_empty());
}
