// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `predict` and
// `preview`, and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::data_config::DataConfig;
use crate::application::train_use_case::{BackendKind, TrainConfig};

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the U-Net on paired hazy/clean images
    Train(TrainArgs),

    /// Dehaze one image using a trained checkpoint
    Predict(PredictArgs),

    /// Write a side-by-side preview of one dataset pair
    Preview(PreviewArgs),
}

/// Compute backend selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendArg {
    Wgpu,
    Ndarray,
}

impl From<BackendArg> for BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Wgpu    => BackendKind::Wgpu,
            BackendArg::Ndarray => BackendKind::NdArray,
        }
    }
}

/// Where the image pairs live, shared by `train` and `preview`
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Root directory holding the clean and hazy subdirectories
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Subdirectory with the clean (normal) images
    #[arg(long, default_value = "normal")]
    pub clean_subdir: String,

    /// Subdirectory with the hazy images
    #[arg(long, default_value = "hazy")]
    pub hazy_subdir: String,

    /// Image file extension shared by both subdirectories
    #[arg(long, default_value = "png")]
    pub extension: String,

    /// Resize factor applied to every image, in (0, 1]
    #[arg(long, default_value_t = 0.5)]
    pub scale: f64,
}

impl From<DataArgs> for DataConfig {
    fn from(a: DataArgs) -> Self {
        DataConfig {
            data_dir:     a.data_dir,
            clean_subdir: a.clean_subdir,
            hazy_subdir:  a.hazy_subdir,
            extension:    a.extension,
            scale:        a.scale,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory to save checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Fraction of pairs held out for evaluation
    #[arg(long, default_value_t = 0.1)]
    pub test_fraction: f64,

    /// Pairs per training step
    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    /// Pairs per evaluation step
    #[arg(long, default_value_t = 1)]
    pub test_batch_size: usize,

    /// Number of full passes through the training split
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// AdamW learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// AdamW decoupled weight decay
    #[arg(long, default_value_t = 0.0)]
    pub weight_decay: f32,

    /// Weight of the summed parameter L2 norms in the loss
    #[arg(long, default_value_t = 1e-5)]
    pub reg_weight: f64,

    /// Filters per U-Net level, comma separated, shallowest first
    #[arg(long, value_delimiter = ',', default_values_t = vec![32, 64, 128, 192])]
    pub num_filters: Vec<usize>,

    /// Channels of the hazy input images
    #[arg(long, default_value_t = 3)]
    pub input_channels: usize,

    /// Channels produced by the final 1x1 convolution
    #[arg(long, default_value_t = 3)]
    pub num_classes: usize,

    /// Use valid (unpadded) 3x3 convolutions; the output shrinks
    #[arg(long)]
    pub no_padding: bool,

    /// Upsample with transposed convolutions instead of bilinear interpolation
    #[arg(long)]
    pub no_bilinear: bool,

    /// Seed for the split, the shuffling and weight initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Data loader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data:            a.data.into(),
            checkpoint_dir:  a.checkpoint_dir,
            test_fraction:   a.test_fraction,
            batch_size:      a.batch_size,
            test_batch_size: a.test_batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            weight_decay:    a.weight_decay,
            reg_weight:      a.reg_weight,
            num_filters:     a.num_filters,
            input_channels:  a.input_channels,
            num_classes:     a.num_classes,
            padding:         !a.no_padding,
            bilinear:        !a.no_bilinear,
            seed:            a.seed,
            num_workers:     a.num_workers,
            backend:         a.backend.into(),
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Hazy image to clean up
    #[arg(long)]
    pub input: String,

    /// Where to write the dehazed image
    #[arg(long, default_value = "result/dehazed.png")]
    pub output: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Override the backend recorded at training time
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,
}

/// All arguments for the `preview` command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Position of the pair in sorted id order
    #[arg(long, default_value_t = 1)]
    pub index: usize,

    /// Where to write the preview strip
    #[arg(long, default_value = "result/preview.png")]
    pub output: String,
}
