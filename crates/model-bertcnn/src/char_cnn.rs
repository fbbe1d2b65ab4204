//! Символьная CNN над окнами вокруг диакритических позиций.
//!
//! Embedding(char_vocab, E) → Conv1d(E → F, k) для каждого k → ReLU →
//! max-pool по окну → concat. Выход: `[W, F * len(kernels)]`.

use candle_core::{Module, Result, Tensor, D};
use candle_nn::{Conv1d, Conv1dConfig, Embedding, VarBuilder};

use crate::config::BertCnnConfig;

/// Символьная CNN.
pub struct CharCnn {
    embedding: Embedding,
    convs: Vec<Conv1d>,
}

impl CharCnn {
    pub fn load(config: &BertCnnConfig, vb: VarBuilder) -> Result<Self> {
        let embedding = candle_nn::embedding(
            config.char_vocab_size,
            config.char_embedding_dim,
            vb.pp("embedding"),
        )?;
        // Без паддинга: свёртка только по реальному окну.
        let cfg = Conv1dConfig::default();
        let convs = config
            .conv_kernel_sizes
            .iter()
            .enumerate()
            .map(|(i, &k)| {
                candle_nn::conv1d(
                    config.char_embedding_dim,
                    config.conv_filters,
                    k,
                    cfg,
                    vb.pp(format!("convs.{i}")),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { embedding, convs })
    }

    /// Прямой проход: `[W, K]` id символов → `[W, F * n_kernels]`.
    pub fn forward(&self, char_windows: &Tensor) -> Result<Tensor> {
        // (W, K) → (W, K, E) → (W, E, K)
        let x = self.embedding.forward(char_windows)?;
        let x = x.transpose(1, 2)?.contiguous()?;

        let pooled = self
            .convs
            .iter()
            .map(|conv| conv.forward(&x)?.relu()?.max(D::Minus1))
            .collect::<Result<Vec<_>>>()?;
        Tensor::cat(&pooled, 1)
    }
}
