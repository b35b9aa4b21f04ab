use image::{imageops::FilterType, DynamicImage, RgbImage};
use ndarray::Array4;
use tract_onnx::prelude::*;

use crate::error::ServiceError;
use crate::models::Classification;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Class labels for the Trash-Net checkpoint shipped as `model.onnx`.
pub const TRASHNET_LABELS: [&str; 6] = ["cardboard", "glass", "metal", "paper", "plastic", "trash"];

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// The handler depends on the classifier only through this seam: an RGB
/// image in, a ranked label/score list out.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<Vec<Classification>, ServiceError>;
}

/// Pretrained ONNX image classifier, loaded once at startup and shared
/// read-only across workers.
pub struct OnnxClassifier {
    plan: OnnxPlan,
    labels: Vec<String>,
}

impl OnnxClassifier {
    pub fn load(model_path: &str, labels: &[&str]) -> Result<Self, ServiceError> {
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| ServiceError::ModelLoad(format!("{model_path}: {e}")))?
            .into_optimized()
            .map_err(|e| ServiceError::ModelLoad(e.to_string()))?
            .into_runnable()
            .map_err(|e| ServiceError::ModelLoad(e.to_string()))?;

        Ok(Self {
            plan,
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &RgbImage) -> Result<Vec<Classification>, ServiceError> {
        let input = preprocess(image);
        let size = INPUT_SIZE as usize;

        let tensor = tract_ndarray::Array4::from_shape_vec((1, 3, size, size), input.into_raw_vec())
            .map_err(|e| ServiceError::Inference(format!("bad input tensor: {e}")))?
            .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ServiceError::Inference(e.to_string()))?;

        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| ServiceError::Inference(e.to_string()))?;
        let logits: Vec<f32> = view.iter().copied().collect();
        if logits.is_empty() {
            return Err(ServiceError::Inference("model produced an empty output".into()));
        }

        Ok(rank(&softmax(&logits), &self.labels))
    }
}

/// Letterboxes the image into a 224x224 canvas (aspect-preserving resize,
/// centered black padding) and normalizes it into an NCHW tensor.
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = if width > height {
        (INPUT_SIZE, (INPUT_SIZE * height) / width)
    } else {
        ((INPUT_SIZE * width) / height, INPUT_SIZE)
    };

    let resized = DynamicImage::ImageRgb8(image.clone())
        .resize(new_width.max(1), new_height.max(1), FilterType::Triangle)
        .to_rgb8();

    let mut canvas = RgbImage::new(INPUT_SIZE, INPUT_SIZE);
    let (resized_width, resized_height) = resized.dimensions();
    let pad_x = (INPUT_SIZE - resized_width) / 2;
    let pad_y = (INPUT_SIZE - resized_height) / 2;

    for y in 0..resized_height {
        for x in 0..resized_width {
            canvas.put_pixel(x + pad_x, y + pad_y, *resized.get_pixel(x, y));
        }
    }

    let mut tensor = Array4::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
    for y in 0..INPUT_SIZE {
        for x in 0..INPUT_SIZE {
            let pixel = canvas.get_pixel(x, y);
            for c in 0..3 {
                let value = (pixel[c] as f32 / 255.0 - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }
    }

    tensor
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Pairs scores with labels and sorts by descending confidence. Classes
/// beyond the supplied label list fall back to an index label, since the
/// model's output width is a property of the checkpoint, not the service.
fn rank(scores: &[f32], labels: &[String]) -> Vec<Classification> {
    let mut ranked: Vec<Classification> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| Classification {
            label: labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("class_{i}")),
            score,
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_normalizes_scores() {
        let scores = softmax(&[2.0, 1.0, 0.1]);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
        // The largest logit keeps the largest probability.
        assert!(scores[0] > scores[1] && scores[1] > scores[2]);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let scores = softmax(&[1000.0, 999.0]);
        assert!(scores.iter().all(|s| s.is_finite()));
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rank_sorts_descending_and_keeps_labels() {
        let labels: Vec<String> = ["cardboard", "glass", "metal"]
            .iter()
            .map(|l| l.to_string())
            .collect();
        let ranked = rank(&[0.1, 0.7, 0.2], &labels);
        assert_eq!(ranked[0].label, "glass");
        assert_eq!(ranked[1].label, "metal");
        assert_eq!(ranked[2].label, "cardboard");
        assert!(ranked[0].score >= ranked[1].score && ranked[1].score >= ranked[2].score);
    }

    #[test]
    fn rank_falls_back_to_index_labels() {
        let labels = vec!["only_one".to_string()];
        let ranked = rank(&[0.2, 0.8], &labels);
        assert_eq!(ranked[0].label, "class_1");
        assert_eq!(ranked[1].label, "only_one");
    }

    #[test]
    fn preprocess_produces_nchw_tensor() {
        let img = RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255]));
        let tensor = preprocess(&img);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn preprocess_letterboxes_non_square_input() {
        // 20x10 white image: resized to 224x112, padded top and bottom.
        let img = RgbImage::from_pixel(20, 10, image::Rgb([255, 255, 255]));
        let tensor = preprocess(&img);

        let white_r = (1.0 - CHANNEL_MEAN[0]) / CHANNEL_STD[0];
        let black_r = (0.0 - CHANNEL_MEAN[0]) / CHANNEL_STD[0];
        assert!((tensor[[0, 0, 112, 112]] - white_r).abs() < 1e-4);
        assert!((tensor[[0, 0, 0, 112]] - black_r).abs() < 1e-4);
    }

    #[test]
    fn preprocess_is_deterministic() {
        let img = RgbImage::from_pixel(33, 17, image::Rgb([12, 200, 77]));
        assert_eq!(preprocess(&img), preprocess(&img));
    }
}
