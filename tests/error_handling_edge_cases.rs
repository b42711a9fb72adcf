//! Failure paths across the pipeline: bad input, bad configuration,
//! misbehaving backends, missing model artifacts

use cityseg::{
    BackendFactory, BackendKind, InferenceBackend, Palette, Result, SegmentationConfig,
    SegmentationError, SegmentationProcessor,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use std::io::Cursor;

fn png_fixture() -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([120, 120, 120])))
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn synthetic_config() -> SegmentationConfig {
    let mut config = SegmentationConfig::cityscapes();
    config.backend = BackendKind::Synthetic;
    config.synthetic_seed = Some(7);
    config.input_size = (16, 16);
    config
}

/// Backend whose output class axis disagrees with the configuration
struct WrongShapeBackend {
    emitted_classes: usize,
    initialized: bool,
}

impl InferenceBackend for WrongShapeBackend {
    fn initialize(
        &mut self,
        _config: &SegmentationConfig,
    ) -> Result<Option<instant::Duration>> {
        self.initialized = true;
        Ok(None)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let (batch, height, width, _) = input.dim();
        Ok(Array4::zeros((batch, height, width, self.emitted_classes)))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 0, 0, 3)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        (1, 0, 0, self.emitted_classes)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Backend that fails every inference call after a clean load
struct FailingInferenceBackend {
    initialized: bool,
}

impl InferenceBackend for FailingInferenceBackend {
    fn initialize(
        &mut self,
        _config: &SegmentationConfig,
    ) -> Result<Option<instant::Duration>> {
        self.initialized = true;
        Ok(None)
    }

    fn infer(&mut self, _input: &Array4<f32>) -> Result<Array4<f32>> {
        Err(SegmentationError::inference("session run failed"))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 0, 0, 3)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        (1, 0, 0, 0)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

enum FaultKind {
    WrongShape(usize),
    FailingInference,
    LoadFailure,
}

struct FaultInjectingFactory {
    fault: FaultKind,
}

impl BackendFactory for FaultInjectingFactory {
    fn create_backend(
        &self,
        _kind: BackendKind,
        _config: &SegmentationConfig,
    ) -> Result<Box<dyn InferenceBackend>> {
        match self.fault {
            FaultKind::WrongShape(emitted_classes) => Ok(Box::new(WrongShapeBackend {
                emitted_classes,
                initialized: false,
            })),
            FaultKind::FailingInference => Ok(Box::new(FailingInferenceBackend {
                initialized: false,
            })),
            FaultKind::LoadFailure => Err(SegmentationError::model(
                "model file not found: model/unet_cityscapes.onnx",
            )),
        }
    }

    fn available_backends(&self) -> Vec<BackendKind> {
        vec![]
    }
}

fn faulty_processor(fault: FaultKind) -> SegmentationProcessor {
    SegmentationProcessor::with_factory(
        synthetic_config(),
        Box::new(FaultInjectingFactory { fault }),
    )
    .unwrap()
}

#[test]
fn empty_input_fails_as_client_error() {
    let processor = SegmentationProcessor::new(synthetic_config()).unwrap();
    let err = processor.process(&[]).unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
    assert!(err.is_client_error());
}

#[test]
fn garbage_bytes_report_every_failed_strategy() {
    let processor = SegmentationProcessor::new(synthetic_config()).unwrap();
    let err = processor.process(b"this is not an image at all").unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("decode error:"), "got: {message}");
    assert!(
        message.contains("decode strategies failed"),
        "aggregated message expected, got: {message}"
    );
}

#[test]
fn truncated_png_is_rejected() {
    let processor = SegmentationProcessor::new(synthetic_config()).unwrap();
    let mut bytes = png_fixture();
    bytes.truncate(bytes.len() / 2);

    let err = processor.process(&bytes).unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
    assert!(err.is_client_error());
}

#[test]
fn config_with_short_palette_is_rejected() {
    let mut config = synthetic_config();
    config.palette = Palette::new(vec![[0, 0, 0]]);
    let err = SegmentationProcessor::new(config).unwrap_err();
    assert!(matches!(err, SegmentationError::InvalidConfig(_)));
    assert!(!err.is_client_error());
}

#[test]
fn config_with_too_many_classes_is_rejected() {
    let err = SegmentationConfig::builder()
        .classes(
            Palette::new(vec![[0, 0, 0]; 300]),
            (0..300).map(|i| format!("class_{i}")).collect(),
        )
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("256"), "got: {err}");
}

#[test]
fn wrong_class_axis_surfaces_as_shape_mismatch() {
    let processor = faulty_processor(FaultKind::WrongShape(5));
    let err = processor.process(&png_fixture()).unwrap_err();
    assert!(matches!(
        err,
        SegmentationError::ShapeMismatch {
            expected: 8,
            actual: 5
        }
    ));
}

#[test]
fn inference_failure_surfaces_without_partial_output() {
    let processor = faulty_processor(FaultKind::FailingInference);
    let err = processor.process(&png_fixture()).unwrap_err();
    assert!(matches!(err, SegmentationError::Inference(_)));
    assert!(!err.is_client_error());
}

#[test]
fn load_failure_is_retried_on_the_next_request() {
    let processor = faulty_processor(FaultKind::LoadFailure);

    for _ in 0..2 {
        let err = processor.process(&png_fixture()).unwrap_err();
        assert!(matches!(err, SegmentationError::ModelUnavailable(_)));
        assert!(!processor.is_initialized(), "failed load must not stick");
    }
}

#[test]
fn readiness_probe_reports_load_failure() {
    let processor = faulty_processor(FaultKind::LoadFailure);
    let err = processor.initialize().unwrap_err();
    assert!(matches!(err, SegmentationError::ModelUnavailable(_)));
    assert!(!processor.is_initialized());
}

#[cfg(feature = "onnx")]
#[test]
fn missing_model_file_is_model_unavailable() {
    let mut config = SegmentationConfig::cityscapes();
    config.model_path = "/nonexistent/model.onnx".into();
    let processor = SegmentationProcessor::new(config).unwrap();

    let err = processor.process(&png_fixture()).unwrap_err();
    assert!(
        matches!(err, SegmentationError::ModelUnavailable(_)),
        "got: {err}"
    );
    assert!(err.to_string().contains("/nonexistent/model.onnx"));
}

#[tokio::test]
async fn reader_entry_point_propagates_decode_errors() {
    let processor = SegmentationProcessor::new(synthetic_config()).unwrap();
    let err = cityseg::segment_from_reader(Cursor::new(b"not an image".to_vec()), &processor)
        .await
        .unwrap_err();
    assert!(matches!(err, SegmentationError::Decode(_)));
}
