// ============================================================
// Layer 5 - Weight Initialisation
// ============================================================
// Every convolution in the U-Net starts from:
//
//   weight ~ N(0, 2 / fan_in)          (He / Kaiming normal, ReLU gain)
//   bias   ~ TruncNormal(0, 0.001²)    (truncated at ±2σ)
//
// Burn's Initializer covers the weights. The bias is replaced
// after construction because Burn applies the same initializer
// to weights and biases.
//
// Truncated normal sampling draws 4 standard-normal candidates
// per element and keeps the first one inside (-2, 2). If all 4
// fall outside (probability ~4e-6) the first candidate is kept.
//
// Reference: He et al. (2015) Delving Deep into Rectifiers
//            Burn Book §3 (Modules, Param)

use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        Initializer,
    },
    prelude::*,
    tensor::Distribution,
};

/// Standard deviation of the truncated-normal bias initialisation.
pub const BIAS_STD: f64 = 0.001;

/// Candidates drawn per element when sampling a truncated normal.
const CANDIDATES: usize = 4;

/// Kaiming normal, fan-in mode, ReLU gain (√2).
pub fn kaiming_relu() -> Initializer {
    Initializer::KaimingNormal {
        gain:         2.0f64.sqrt(),
        fan_out_only: false,
    }
}

/// Sample `len` values from N(mean, std²) truncated to mean ± 2·std.
pub fn truncated_normal<B: Backend>(
    len:    usize,
    mean:   f64,
    std:    f64,
    device: &B::Device,
) -> Tensor<B, 1> {
    let candidates = Tensor::<B, 2>::random(
        [len, CANDIDATES],
        Distribution::Normal(0.0, 1.0),
        device,
    );

    // 1 where the candidate is inside (-2, 2), 0 elsewhere
    let valid = candidates.clone().lower_elem(2.0).int()
        * candidates.clone().greater_elem(-2.0).int();

    // First valid candidate per row, shape [len, 1]
    let index = valid.argmax(1);
    candidates
        .gather(1, index)
        .reshape([len])
        .mul_scalar(std)
        .add_scalar(mean)
}

/// Replace a bias parameter with fresh truncated-normal values.
fn reinit_bias<B: Backend>(bias: Param<Tensor<B, 1>>, device: &B::Device) -> Param<Tensor<B, 1>> {
    let [len] = bias.val().dims();
    Param::from_tensor(truncated_normal(len, 0.0, BIAS_STD, device))
}

/// Build a Conv2d with Kaiming weights and a truncated-normal bias.
pub fn init_conv2d<B: Backend>(config: Conv2dConfig, device: &B::Device) -> Conv2d<B> {
    let mut conv = config.with_initializer(kaiming_relu()).init(device);
    conv.bias = conv.bias.map(|b| reinit_bias(b, device));
    conv
}

/// Build a ConvTranspose2d with Kaiming weights and a truncated-normal bias.
pub fn init_conv_transpose2d<B: Backend>(
    config: ConvTranspose2dConfig,
    device: &B::Device,
) -> ConvTranspose2d<B> {
    let mut conv = config.with_initializer(kaiming_relu()).init(device);
    conv.bias = conv.bias.map(|b| reinit_bias(b, device));
    conv
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_truncated_normal_is_bounded() {
        let device = Default::default();
        let t = truncated_normal::<TestBackend>(512, 0.5, 0.01, &device);
        assert_eq!(t.dims(), [512]);
        for v in values(t) {
            // 10σ leaves room for the ~4e-6 fallback case
            assert!((v - 0.5).abs() < 0.1, "value {v} out of range");
        }
    }

    #[test]
    fn test_conv_bias_is_small() {
        let device = Default::default();
        let conv: Conv2d<TestBackend> = init_conv2d(Conv2dConfig::new([4, 8], [3, 3]), &device);
        let bias = conv.bias.expect("conv has a bias");
        for v in values(bias.val()) {
            assert!(v.abs() < 0.01);
        }
    }

    #[test]
    fn test_kaiming_weight_spread() {
        let device = Default::default();
        let conv: Conv2d<TestBackend> = init_conv2d(Conv2dConfig::new([16, 16], [3, 3]), &device);
        let w = values(conv.weight.val());

        // fan_in = 16 * 3 * 3, expected std = sqrt(2 / fan_in)
        let expected = (2.0f32 / 144.0).sqrt();
        let mean = w.iter().sum::<f32>() / w.len() as f32;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / w.len() as f32;
        let std = var.sqrt();
        assert!((std - expected).abs() / expected < 0.2, "std {std} vs {expected}");
    }

    #[test]
    fn test_transpose_bias_is_reinitialised() {
        let device = Default::default();
        let up: ConvTranspose2d<TestBackend> = init_conv_transpose2d(
            ConvTranspose2dConfig::new([8, 8], [2, 2]).with_stride([2, 2]),
            &device,
        );
        let bias = up.bias.expect("transpose conv has a bias");
        assert_eq!(bias.val().dims(), [8]);
        for v in values(bias.val()) {
            assert!(v.abs() < 0.01);
        }
    }
}
