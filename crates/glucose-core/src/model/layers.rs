//! Building blocks of the forecast network

use super::Mode;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

pub(crate) fn relu(v: f32) -> f32 {
    v.max(0.0)
}

/// Fully connected layer, `y = W x + b`
#[derive(Debug, Clone)]
pub struct Linear {
    /// `[out_features, in_features]`
    pub(crate) weight: Array2<f32>,
    pub(crate) bias: Array1<f32>,
}

impl Linear {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Self {
        Self { weight, bias }
    }

    pub fn forward(&self, x: ArrayView1<f32>) -> Array1<f32> {
        self.weight.dot(&x) + &self.bias
    }
}

/// One recurrent layer with input/forget/cell/output gates.
///
/// Gate rows are stacked in the order i, f, g, o inside the `4 * hidden`
/// dimension of both weight matrices.
#[derive(Debug, Clone)]
pub struct LstmLayer {
    /// `[4 * hidden, input]`
    pub(crate) weight_ih: Array2<f32>,
    /// `[4 * hidden, hidden]`
    pub(crate) weight_hh: Array2<f32>,
    pub(crate) bias_ih: Array1<f32>,
    pub(crate) bias_hh: Array1<f32>,
    bias: Array1<f32>,
}

impl LstmLayer {
    pub fn new(
        weight_ih: Array2<f32>,
        weight_hh: Array2<f32>,
        bias_ih: Array1<f32>,
        bias_hh: Array1<f32>,
    ) -> Self {
        let bias = &bias_ih + &bias_hh;
        Self {
            weight_ih,
            weight_hh,
            bias_ih,
            bias_hh,
            bias,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.weight_hh.ncols()
    }

    /// Run the layer over `inputs` (`[steps, input]`) from a zero state.
    ///
    /// Returns the hidden state after every step (`[steps, hidden]`); the
    /// last row is the final hidden state.
    pub fn forward(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let hidden = self.hidden_size();
        let mut h = Array1::<f32>::zeros(hidden);
        let mut c = Array1::<f32>::zeros(hidden);
        let mut outputs = Array2::<f32>::zeros((inputs.nrows(), hidden));

        for (t, x) in inputs.outer_iter().enumerate() {
            let gates = self.weight_ih.dot(&x) + self.weight_hh.dot(&h) + &self.bias;

            let i = gates.slice(s![0..hidden]).mapv(sigmoid);
            let f = gates.slice(s![hidden..2 * hidden]).mapv(sigmoid);
            let g = gates.slice(s![2 * hidden..3 * hidden]).mapv(f32::tanh);
            let o = gates.slice(s![3 * hidden..]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f32::tanh);
            outputs.row_mut(t).assign(&h);
        }

        outputs
    }
}

/// Inverted dropout: active only in [`Mode::Training`]
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    p: f32,
}

impl Dropout {
    /// `p` is clamped into `[0, 1)` so the survivor scale stays finite
    pub fn new(p: f32) -> Self {
        Self {
            p: p.clamp(0.0, 0.99),
        }
    }

    pub fn forward(&self, x: Array1<f32>, mode: Mode) -> Array1<f32> {
        match mode {
            Mode::Inference => x,
            Mode::Training => {
                let keep_scale = 1.0 / (1.0 - self.p);
                let p = self.p;
                let mut rng = rand::thread_rng();
                x.mapv_into(|v| {
                    if rng.gen::<f32>() < p {
                        0.0
                    } else {
                        v * keep_scale
                    }
                })
            }
        }
    }
}
