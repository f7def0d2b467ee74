// ============================================================
// Layer 5 — DCGAN Building Blocks
// ============================================================
// Three parametric convolutional stacks, all using 4×4 kernels,
// stride 2, padding 1 and no bias:
//
//   Encoder        [N, n_in, S, S] → [N, n_out, 1, 1]
//                  conv+BN+ReLU, channels double per layer
//
//   Decoder        [N, n_in, 1, 1] → [N, n_out, S, S]
//                  tconv+BN+ReLU, channels halve per layer
//
//   Discriminator  [N, n_in, S, S] → [N, n_out, 1, 1]
//                  like the encoder, LeakyReLU(0.2), no BN on
//                  the first layer
//
// With n_layers = 4 and S = 64 the spatial sizes go
// 64 → 32 → 16 → 8 → 4 and a final "fully connected" conv
// with a 4×4 kernel collapses the rest to 1×1.
//
// The pair GAN uses:
//   Generator      decoder(size_z → 2·nc) followed by tanh;
//                  the two nc-channel halves are the two images
//   Discriminator  discriminator(2·nc → 1) on concatenated pairs
//
// Reference: Radford et al. (2016) DCGAN
//            Burn Book §3 (Building Blocks)

use anyhow::{bail, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation,
};

const KERNEL: usize = 4;
const LEAKY_SLOPE: f64 = 0.2;

/// Spatial size left after `n_layers` stride-2 convolutions.
/// Errors if `size_x` is not an exact multiple of `2^n_layers`.
pub fn final_size(size_x: usize, n_layers: usize) -> Result<usize> {
    if n_layers == 0 {
        bail!("n_layers must be at least 1");
    }
    if n_layers >= usize::BITS as usize {
        bail!("n_layers = {n_layers} is too large");
    }
    let factor = 1usize << n_layers;
    if size_x < factor || size_x % factor != 0 {
        bail!("size_x = {size_x} must be a positive multiple of 2^n_layers = {factor}");
    }
    Ok(size_x / factor)
}

fn strided_conv<B: Backend>(c_in: usize, c_out: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([c_in, c_out], [KERNEL, KERNEL])
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

fn strided_tconv<B: Backend>(c_in: usize, c_out: usize, device: &B::Device) -> ConvTranspose2d<B> {
    ConvTranspose2dConfig::new([c_in, c_out], [KERNEL, KERNEL])
        .with_stride([2, 2])
        .with_padding([1, 1])
        .with_bias(false)
        .init(device)
}

// ─── Blocks ───────────────────────────────────────────────────────────────────

/// conv → (BN) → ReLU / LeakyReLU, halving the spatial size
#[derive(Module, Debug)]
pub struct DownBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: Option<BatchNorm<B>>,
    /// 0.0 means plain ReLU
    pub negative_slope: f64,
}

impl<B: Backend> DownBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };
        if self.negative_slope == 0.0 {
            activation::relu(x)
        } else {
            activation::leaky_relu(x, self.negative_slope)
        }
    }
}

/// transposed conv → BN → ReLU
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    pub conv: ConvTranspose2d<B>,
    pub norm: BatchNorm<B>,
}

impl<B: Backend> UpBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        activation::relu(self.norm.forward(self.conv.forward(x)))
    }
}

/// Builds the shared downsampling trunk of the encoder and the
/// discriminator. Returns the blocks and the final channel count.
fn down_stack<B: Backend>(
    n_in:           usize,
    nf:             usize,
    n_layers:       usize,
    norm_first:     bool,
    negative_slope: f64,
    device:         &B::Device,
) -> (Vec<DownBlock<B>>, usize) {
    let mut blocks   = Vec::with_capacity(n_layers);
    let mut c_in     = n_in;
    let mut channels = nf;

    for i in 0..n_layers {
        if i > 0 {
            channels *= 2;
        }
        let norm = (i > 0 || norm_first).then(|| BatchNormConfig::new(channels).init(device));
        blocks.push(DownBlock {
            conv: strided_conv(c_in, channels, device),
            norm,
            negative_slope,
        });
        c_in = channels;
    }
    (blocks, channels)
}

fn collapse_conv<B: Backend>(c_in: usize, c_out: usize, kernel: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([c_in, c_out], [kernel, kernel])
        .with_bias(false)
        .init(device)
}

// ─── Encoder ──────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct DcEncoderConfig {
    pub n_in:  usize,
    pub n_out: usize,
    #[config(default = 64)]
    pub nf: usize,
    #[config(default = 4)]
    pub n_layers: usize,
    #[config(default = 64)]
    pub size_x: usize,
}

impl DcEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DcEncoder<B>> {
        let kernel = final_size(self.size_x, self.n_layers)?;
        let (blocks, channels) = down_stack(self.n_in, self.nf, self.n_layers, true, 0.0, device);
        let head = collapse_conv(channels, self.n_out, kernel, device);
        Ok(DcEncoder { blocks, head })
    }
}

#[derive(Module, Debug)]
pub struct DcEncoder<B: Backend> {
    pub blocks: Vec<DownBlock<B>>,
    pub head:   Conv2d<B>,
}

impl<B: Backend> DcEncoder<B> {
    /// [N, n_in, S, S] → [N, n_out, 1, 1]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));
        self.head.forward(x)
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct DcDecoderConfig {
    pub n_in:  usize,
    pub n_out: usize,
    #[config(default = 64)]
    pub nf: usize,
    #[config(default = 4)]
    pub n_layers: usize,
    #[config(default = 64)]
    pub size_x: usize,
}

impl DcDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DcDecoder<B>> {
        let start = final_size(self.size_x, self.n_layers)?;
        let mut channels = self.nf << (self.n_layers - 1);

        let mut blocks = Vec::with_capacity(self.n_layers);
        // 1×1 noise → start×start feature map
        blocks.push(UpBlock {
            conv: ConvTranspose2dConfig::new([self.n_in, channels], [start, start])
                .with_bias(false)
                .init(device),
            norm: BatchNormConfig::new(channels).init(device),
        });
        for _ in 1..self.n_layers {
            blocks.push(UpBlock {
                conv: strided_tconv(channels, channels / 2, device),
                norm: BatchNormConfig::new(channels / 2).init(device),
            });
            channels /= 2;
        }
        let out = strided_tconv(channels, self.n_out, device);
        Ok(DcDecoder { blocks, out })
    }
}

#[derive(Module, Debug)]
pub struct DcDecoder<B: Backend> {
    pub blocks: Vec<UpBlock<B>>,
    pub out:    ConvTranspose2d<B>,
}

impl<B: Backend> DcDecoder<B> {
    /// [N, n_in, 1, 1] → [N, n_out, S, S], unbounded
    pub fn forward(&self, z: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.blocks.iter().fold(z, |x, block| block.forward(x));
        self.out.forward(x)
    }
}

// ─── Discriminator ────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct DcDiscriminatorConfig {
    pub n_in:  usize,
    pub n_out: usize,
    #[config(default = 64)]
    pub nf: usize,
    #[config(default = 4)]
    pub n_layers: usize,
    #[config(default = 64)]
    pub size_x: usize,
}

impl DcDiscriminatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DcDiscriminator<B>> {
        let kernel = final_size(self.size_x, self.n_layers)?;
        let (blocks, channels) =
            down_stack(self.n_in, self.nf, self.n_layers, false, LEAKY_SLOPE, device);
        let head = collapse_conv(channels, self.n_out, kernel, device);
        Ok(DcDiscriminator { blocks, head })
    }
}

#[derive(Module, Debug)]
pub struct DcDiscriminator<B: Backend> {
    pub blocks: Vec<DownBlock<B>>,
    pub head:   Conv2d<B>,
}

impl<B: Backend> DcDiscriminator<B> {
    /// [N, n_in, S, S] → logits [N, n_out, 1, 1]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));
        self.head.forward(x)
    }
}

// ─── Pair GAN ─────────────────────────────────────────────────────────────────

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct PairGanConfig {
    /// Channels of ONE image; generated pairs have twice as many
    pub channels: usize,
    pub size_x:   usize,
    pub size_z:   usize,
    pub nf:       usize,
    pub n_layers: usize,
}

impl PairGanConfig {
    pub fn init_generator<B: Backend>(&self, device: &B::Device) -> Result<Generator<B>> {
        let decoder = DcDecoderConfig::new(self.size_z, 2 * self.channels)
            .with_nf(self.nf)
            .with_n_layers(self.n_layers)
            .with_size_x(self.size_x)
            .init(device)?;
        Ok(Generator { decoder, size_z: self.size_z })
    }

    pub fn init_discriminator<B: Backend>(&self, device: &B::Device) -> Result<PairDiscriminator<B>> {
        let net = DcDiscriminatorConfig::new(2 * self.channels, 1)
            .with_nf(self.nf)
            .with_n_layers(self.n_layers)
            .with_size_x(self.size_x)
            .init(device)?;
        Ok(PairDiscriminator { net })
    }
}

#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    pub decoder: DcDecoder<B>,
    pub size_z:  usize,
}

impl<B: Backend> Generator<B> {
    /// Noise [N, size_z, 1, 1] → pair images [N, 2·nc, S, S] in [-1, 1]
    pub fn forward(&self, z: Tensor<B, 4>) -> Tensor<B, 4> {
        activation::tanh(self.decoder.forward(z))
    }
}

#[derive(Module, Debug)]
pub struct PairDiscriminator<B: Backend> {
    pub net: DcDiscriminator<B>,
}

impl<B: Backend> PairDiscriminator<B> {
    /// Pairs [N, 2·nc, S, S] → one logit per pair, shape [N]
    pub fn forward(&self, pairs: Tensor<B, 4>) -> Tensor<B, 1> {
        let n = pairs.dims()[0];
        self.net.forward(pairs).reshape([n])
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray;

    fn small_gan() -> PairGanConfig {
        PairGanConfig::new(3, 16, 8, 4, 2)
    }

    #[test]
    fn test_final_size() {
        assert_eq!(final_size(64, 4).unwrap(), 4);
        assert_eq!(final_size(16, 4).unwrap(), 1);
        assert!(final_size(48, 5).is_err());
        assert!(final_size(8, 4).is_err());
        assert!(final_size(64, 0).is_err());
    }

    #[test]
    fn test_encoder_collapses_to_vector() {
        let device = Default::default();
        let encoder: DcEncoder<TestBackend> = DcEncoderConfig::new(3, 10)
            .with_nf(4)
            .with_n_layers(2)
            .with_size_x(16)
            .init(&device)
            .unwrap();
        assert_eq!(encoder.blocks.len(), 2);
        assert!(encoder.blocks.iter().all(|b| b.norm.is_some()));

        let x = Tensor::<TestBackend, 4>::random([2, 3, 16, 16], Distribution::Default, &device);
        assert_eq!(encoder.forward(x).dims(), [2, 10, 1, 1]);
    }

    #[test]
    fn test_decoder_expands_to_image() {
        let device = Default::default();
        let decoder: DcDecoder<TestBackend> = DcDecoderConfig::new(8, 6)
            .with_nf(4)
            .with_n_layers(3)
            .with_size_x(32)
            .init(&device)
            .unwrap();
        assert_eq!(decoder.blocks.len(), 3);

        let z = Tensor::<TestBackend, 4>::random([2, 8, 1, 1], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(decoder.forward(z).dims(), [2, 6, 32, 32]);
    }

    #[test]
    fn test_discriminator_skips_first_norm() {
        let device = Default::default();
        let disc: DcDiscriminator<TestBackend> = DcDiscriminatorConfig::new(6, 1)
            .with_nf(4)
            .with_n_layers(3)
            .with_size_x(32)
            .init(&device)
            .unwrap();
        assert!(disc.blocks[0].norm.is_none());
        assert!(disc.blocks[1..].iter().all(|b| b.norm.is_some()));
        assert!(disc.blocks.iter().all(|b| b.negative_slope == LEAKY_SLOPE));
    }

    #[test]
    fn test_generator_output_is_bounded_pair() {
        let device = Default::default();
        let generator: Generator<TestBackend> = small_gan().init_generator(&device).unwrap();
        let z = Tensor::<TestBackend, 4>::random([3, 8, 1, 1], Distribution::Normal(0.0, 1.0), &device);
        let out = generator.forward(z);
        assert_eq!(out.dims(), [3, 6, 16, 16]);

        let values = out.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_pair_discriminator_gives_one_logit_per_pair() {
        let device = Default::default();
        let disc: PairDiscriminator<TestBackend> = small_gan().init_discriminator(&device).unwrap();
        let pairs = Tensor::<TestBackend, 4>::random([5, 6, 16, 16], Distribution::Default, &device);
        assert_eq!(disc.forward(pairs).dims(), [5]);
    }

    #[test]
    fn test_bad_geometry_is_rejected() {
        let device = Default::default();
        let cfg = PairGanConfig::new(3, 18, 8, 4, 2);
        assert!(cfg.init_generator::<TestBackend>(&device).is_err());
    }
}
