// ============================================================
// Layer 5 - U-Net Model
// ============================================================
// Contracting path of DownConvBlocks, expansive path of
// UpConvBlocks joined by skip connections, optional 1x1 head.
//
//   level 0:  3x(conv3x3 + ReLU)                 -> bridge 0
//   level i:  avgpool 2x2 → 3x(conv3x3 + ReLU)   -> bridge i
//   up i:     x2 upsample → crop → cat(bridge i) → 3x(conv3x3 + ReLU)
//   head:     conv1x1 → num_classes
//
// Pooling runs in ceil mode: an odd edge keeps its last row or
// column, averaged over the cells inside the map only.
// Bilinear upsampling samples with align_corners and is a pair
// of matmuls against fixed interpolation matrices.
//
// Reference: Ronneberger et al. (2015) U-Net

use anyhow::{ensure, Result};
use burn::{
    module::Param,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        pool::{AvgPool2d, AvgPool2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::ml::init::{init_conv2d, init_conv_transpose2d};

/// Convolutions per down/up block.
const CONVS_PER_BLOCK: usize = 3;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct UNetConfig {
    pub input_channels: usize,
    /// Output channels of the final 1x1 convolution.
    pub num_classes:    usize,
    /// Filters per contracting level, shallowest first.
    pub num_filters:    Vec<usize>,
    /// Zero-pad 3x3 convolutions so they keep the spatial size.
    #[config(default = true)]
    pub padding:          bool,
    /// Upsample by bilinear interpolation instead of a transposed conv.
    #[config(default = true)]
    pub bilinear:         bool,
    #[config(default = true)]
    pub apply_last_layer: bool,
}

impl UNetConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.input_channels > 0, "input_channels must be positive");
        ensure!(!self.num_filters.is_empty(), "num_filters must name at least one level");
        ensure!(
            self.num_filters.iter().all(|&f| f > 0),
            "num_filters must all be positive, got {:?}",
            self.num_filters
        );
        ensure!(
            !self.apply_last_layer || self.num_classes > 0,
            "num_classes must be positive when the last layer is applied"
        );
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet<B> {
        let mut contracting_path = Vec::with_capacity(self.num_filters.len());
        let mut channels = self.input_channels;
        for (i, &filters) in self.num_filters.iter().enumerate() {
            // The first level sees full resolution
            let pool = i != 0;
            contracting_path.push(DownConvBlock::new(channels, filters, self.padding, pool, device));
            channels = filters;
        }

        let mut upsampling_path = Vec::with_capacity(self.num_filters.len().saturating_sub(1));
        for &filters in self.num_filters.iter().rev().skip(1) {
            upsampling_path.push(UpConvBlock::new(
                channels,
                filters,
                filters,
                self.padding,
                self.bilinear,
                device,
            ));
            channels = filters;
        }

        let last_layer = self
            .apply_last_layer
            .then(|| Conv2dConfig::new([channels, self.num_classes], [1, 1]).init(device));

        UNet { contracting_path, upsampling_path, last_layer }
    }
}

fn padding_config(padding: bool) -> PaddingConfig2d {
    if padding {
        PaddingConfig2d::Explicit(1, 1)
    } else {
        PaddingConfig2d::Valid
    }
}

fn param_norm<B: Backend, const D: usize>(param: &Param<Tensor<B, D>>) -> Tensor<B, 1> {
    param.val().powf_scalar(2.0).sum().sqrt()
}

fn conv_norms<B: Backend>(conv: &Conv2d<B>) -> Vec<Tensor<B, 1>> {
    let mut norms = vec![param_norm(&conv.weight)];
    norms.extend(conv.bias.as_ref().map(param_norm));
    norms
}

/// Crop the spatial dims of `x` to `height x width` around its centre.
pub fn center_crop<B: Backend>(x: Tensor<B, 4>, height: usize, width: usize) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    if h == height && w == width {
        return x;
    }
    let top  = (h - height) / 2;
    let left = (w - width) / 2;
    x.slice([0..n, 0..c, top..top + height, left..left + width])
}

/// Align-corners interpolation weights of a x2 resize along one axis,
/// row-major `[2 * size, size]`.
fn align_corners_weights(size: usize) -> Vec<f32> {
    let out = size * 2;
    let mut weights = vec![0.0f32; out * size];
    for (j, row) in weights.chunks_mut(size).enumerate() {
        if size == 1 {
            row[0] = 1.0;
            continue;
        }
        let src = (j * (size - 1)) as f64 / (out - 1) as f64;
        let i0 = (src.floor() as usize).min(size - 1);
        let i1 = (i0 + 1).min(size - 1);
        let frac = (src - i0 as f64) as f32;
        row[i0] += 1.0 - frac;
        row[i1] += frac;
    }
    weights
}

/// x2 bilinear upsampling with `align_corners = true`.
///
/// Separable: `rows · x · colsᵀ` with constant interpolation matrices.
pub fn upsample_bilinear_x2<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    let device = x.device();

    let rows = Tensor::<B, 2>::from_data(TensorData::new(align_corners_weights(h), [2 * h, h]), &device)
        .reshape([1, 1, 2 * h, h])
        .expand([n, c, 2 * h, h]);
    let cols = Tensor::<B, 2>::from_data(TensorData::new(align_corners_weights(w), [2 * w, w]), &device)
        .transpose()
        .reshape([1, 1, w, 2 * w])
        .expand([n, c, w, 2 * w]);

    rows.matmul(x.matmul(cols))
}

/// 2x2 / stride-2 average pooling in ceil mode.
///
/// Odd edges are zero-padded, then each window is divided by the number
/// of its cells that lie inside the input.
pub fn avg_pool_ceil<B: Backend>(pool: &AvgPool2d, x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    let (pad_h, pad_w) = (h % 2, w % 2);
    if pad_h == 0 && pad_w == 0 {
        return pool.forward(x);
    }

    let device = x.device();
    let sums = pool.forward(x.pad((0, pad_w, 0, pad_h), 0.0));
    let coverage = pool.forward(Tensor::<B, 4>::ones([1, 1, h, w], &device).pad((0, pad_w, 0, pad_h), 0.0));
    let [_, _, ph, pw] = sums.dims();
    sums / coverage.expand([n, c, ph, pw])
}

// ─── DownConvBlock ────────────────────────────────────────────────────────────
/// Optional 2x2 average pooling followed by three 3x3 conv + ReLU.
#[derive(Module, Debug)]
pub struct DownConvBlock<B: Backend> {
    pool:  Option<AvgPool2d>,
    convs: Vec<Conv2d<B>>,
    relu:  Relu,
}

impl<B: Backend> DownConvBlock<B> {
    pub fn new(
        input_dim:  usize,
        output_dim: usize,
        padding:    bool,
        pool:       bool,
        device:     &B::Device,
    ) -> Self {
        let pool = pool.then(|| AvgPool2dConfig::new([2, 2]).with_strides([2, 2]).init());
        let convs = (0..CONVS_PER_BLOCK)
            .map(|i| {
                let input = if i == 0 { input_dim } else { output_dim };
                init_conv2d(
                    Conv2dConfig::new([input, output_dim], [3, 3])
                        .with_padding(padding_config(padding)),
                    device,
                )
            })
            .collect();

        Self { pool, convs, relu: Relu::new() }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = match &self.pool {
            Some(pool) => avg_pool_ceil(pool, x),
            None => x,
        };

        for conv in &self.convs {
            x = self.relu.forward(conv.forward(x));
        }
        x
    }

    fn norms(&self) -> Vec<Tensor<B, 1>> {
        self.convs.iter().flat_map(conv_norms).collect()
    }
}

// ─── UpConvBlock ──────────────────────────────────────────────────────────────
/// x2 upsampling, skip concatenation, then a DownConvBlock without pooling.
#[derive(Module, Debug)]
pub struct UpConvBlock<B: Backend> {
    /// Present only when bilinear upsampling is disabled
    upconv:     Option<ConvTranspose2d<B>>,
    conv_block: DownConvBlock<B>,
}

impl<B: Backend> UpConvBlock<B> {
    /// `input_dim` channels arrive from below, `bridge_dim` from the skip.
    pub fn new(
        input_dim:  usize,
        bridge_dim: usize,
        output_dim: usize,
        padding:    bool,
        bilinear:   bool,
        device:     &B::Device,
    ) -> Self {
        let upconv = (!bilinear).then(|| {
            init_conv_transpose2d(
                ConvTranspose2dConfig::new([input_dim, input_dim], [2, 2]).with_stride([2, 2]),
                device,
            )
        });
        let conv_block =
            DownConvBlock::new(input_dim + bridge_dim, output_dim, padding, false, device);

        Self { upconv, conv_block }
    }

    pub fn forward(&self, x: Tensor<B, 4>, bridge: Tensor<B, 4>) -> Tensor<B, 4> {
        let up = match &self.upconv {
            Some(conv) => conv.forward(x),
            None => upsample_bilinear_x2(x),
        };

        // Ceil-mode pooling can leave `up` one pixel larger than the bridge,
        // valid convolutions leave the bridge larger than `up`.
        let [_, _, uh, uw] = up.dims();
        let [_, _, bh, bw] = bridge.dims();
        let (h, w) = (uh.min(bh), uw.min(bw));
        let up = center_crop(up, h, w);
        let bridge = center_crop(bridge, h, w);

        let out = Tensor::cat(vec![up, bridge], 1);
        self.conv_block.forward(out)
    }

    fn norms(&self) -> Vec<Tensor<B, 1>> {
        let mut norms = self.conv_block.norms();
        if let Some(conv) = &self.upconv {
            norms.push(param_norm(&conv.weight));
            norms.extend(conv.bias.as_ref().map(param_norm));
        }
        norms
    }
}

// ─── UNet ─────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    contracting_path: Vec<DownConvBlock<B>>,
    upsampling_path:  Vec<UpConvBlock<B>>,
    last_layer:       Option<Conv2d<B>>,
}

impl<B: Backend> UNet<B> {
    /// [batch, C_in, H, W] → [batch, num_classes, H, W]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.forward_features(x);
        match &self.last_layer {
            Some(last) => last.forward(x),
            None => x,
        }
    }

    /// Decoder activations before the final 1x1 convolution.
    pub fn forward_features(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let depth = self.contracting_path.len();
        let mut bridges = Vec::with_capacity(depth.saturating_sub(1));
        let mut x = x;

        for (i, down) in self.contracting_path.iter().enumerate() {
            x = down.forward(x);
            if i + 1 != depth {
                bridges.push(x.clone());
            }
        }

        for (up, bridge) in self.upsampling_path.iter().zip(bridges.into_iter().rev()) {
            x = up.forward(x, bridge);
        }
        x
    }

    /// Sum of the L2 norms of every weight and bias tensor, shape [1].
    pub fn l2_regularization(&self) -> Tensor<B, 1> {
        let mut norms: Vec<Tensor<B, 1>> =
            self.contracting_path.iter().flat_map(|b| b.norms()).collect();
        norms.extend(self.upsampling_path.iter().flat_map(|b| b.norms()));
        if let Some(last) = &self.last_layer {
            norms.extend(conv_norms(last));
        }

        match norms.first() {
            Some(first) => {
                let device = first.device();
                norms.into_iter().fold(Tensor::zeros([1], &device), |acc, n| acc + n)
            }
            None => Tensor::zeros([1], &Default::default()),
        }
    }

    pub fn depth(&self) -> usize {
        self.contracting_path.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn small_config() -> UNetConfig {
        UNetConfig::new(3, 3, vec![4, 8, 8])
    }

    #[test]
    fn test_bilinear_output_shape() {
        let device = Default::default();
        let model: UNet<TestBackend> = small_config().init(&device);
        let x = Tensor::<TestBackend, 4>::zeros([2, 3, 16, 16], &device);
        assert_eq!(model.forward(x).dims(), [2, 3, 16, 16]);
        assert_eq!(model.depth(), 3);
    }

    #[test]
    fn test_transposed_conv_output_shape() {
        let device = Default::default();
        let model: UNet<TestBackend> = small_config().with_bilinear(false).init(&device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 16, 16], &device);
        assert_eq!(model.forward(x).dims(), [1, 3, 16, 16]);
    }

    #[test]
    fn test_odd_input_keeps_size() {
        let device = Default::default();
        let model: UNet<TestBackend> = small_config().init(&device);
        let x = Tensor::<TestBackend, 4>::ones([1, 3, 13, 10], &device);
        assert_eq!(model.forward(x).dims(), [1, 3, 13, 10]);
    }

    #[test]
    fn test_features_skip_last_layer() {
        let device = Default::default();
        let model: UNet<TestBackend> = UNetConfig::new(1, 2, vec![4, 6]).init(&device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 8, 8], &device);
        assert_eq!(model.forward_features(x.clone()).dims(), [1, 4, 8, 8]);
        assert_eq!(model.forward(x).dims(), [1, 2, 8, 8]);

        let headless: UNet<TestBackend> = UNetConfig::new(1, 2, vec![4, 6])
            .with_apply_last_layer(false)
            .init(&device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 8, 8], &device);
        assert_eq!(headless.forward(x).dims(), [1, 4, 8, 8]);
    }

    #[test]
    fn test_l2_regularization_positive() {
        let device = Default::default();
        let model: UNet<TestBackend> = small_config().init(&device);
        let reg: f32 = model.l2_regularization().into_scalar().elem();
        assert!(reg.is_finite() && reg > 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(small_config().validate().is_ok());
        assert!(UNetConfig::new(3, 3, vec![]).validate().is_err());
        assert!(UNetConfig::new(3, 3, vec![4, 0]).validate().is_err());
        assert!(UNetConfig::new(0, 3, vec![4]).validate().is_err());
    }

    #[test]
    fn test_valid_convolutions_shrink_output() {
        let device = Default::default();
        let model: UNet<TestBackend> = UNetConfig::new(3, 3, vec![4, 8])
            .with_padding(false)
            .init(&device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 64], &device);
        // 64 -> 58, pool 29 -> 23, up 46 -> 40
        assert_eq!(model.forward(x).dims(), [1, 3, 40, 40]);
    }

    #[test]
    fn test_ceil_pool_averages_inside_cells_only() {
        let device = Default::default();
        let pool = AvgPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        let ones = Tensor::<TestBackend, 4>::ones([1, 1, 3, 3], &device);
        let pooled = avg_pool_ceil(&pool, ones);
        assert_eq!(pooled.dims(), [1, 1, 2, 2]);
        let values = pooled.into_data().to_vec::<f32>().unwrap();
        for v in values {
            assert!((v - 1.0).abs() < 1e-6);
        }

        // 0 1 2 / 3 4 5 / 6 7 8
        let ramp = Tensor::<TestBackend, 1>::from_floats(
            [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            &device,
        )
        .reshape([1, 1, 3, 3]);
        let values = avg_pool_ceil(&pool, ramp).into_data().to_vec::<f32>().unwrap();
        let expected = [2.0, 3.5, 6.5, 8.0];
        for (v, e) in values.iter().zip(expected) {
            assert!((v - e).abs() < 1e-5, "{values:?}");
        }
    }

    #[test]
    fn test_bilinear_upsample_align_corners() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 2.0, 3.0], &device)
            .reshape([1, 1, 2, 2]);
        let up = upsample_bilinear_x2(x);
        assert_eq!(up.dims(), [1, 1, 4, 4]);

        let v = up.into_data().to_vec::<f32>().unwrap();
        let at = |r: usize, c: usize| v[r * 4 + c];
        // Corners keep the input values
        assert!((at(0, 0) - 0.0).abs() < 1e-6);
        assert!((at(0, 3) - 1.0).abs() < 1e-6);
        assert!((at(3, 0) - 2.0).abs() < 1e-6);
        assert!((at(3, 3) - 3.0).abs() < 1e-6);
        assert!((at(0, 1) - 1.0 / 3.0).abs() < 1e-6);
        assert!((at(1, 0) - 2.0 / 3.0).abs() < 1e-6);
        assert!((at(2, 2) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_bilinear_model_backward() {
        use burn::backend::Autodiff;
        type AutodiffBackend = Autodiff<NdArray<f32>>;

        let device = Default::default();
        let model: UNet<AutodiffBackend> = small_config().init(&device);
        let x = Tensor::<AutodiffBackend, 4>::ones([1, 3, 9, 9], &device);
        let loss = model.forward(x).powf_scalar(2.0).mean();
        let grads = loss.backward();

        let first = &model.contracting_path[0].convs[0];
        let grad = first.weight.grad(&grads).expect("weight gradient");
        let norm: f32 = grad.powf_scalar(2.0).sum().into_scalar().elem();
        assert!(norm.is_finite());
    }

    #[test]
    fn test_center_crop() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::zeros([1, 2, 7, 9], &device);
        assert_eq!(center_crop(x, 5, 4).dims(), [1, 2, 5, 4]);
    }
}
