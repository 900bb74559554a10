//! Sequence-to-vector glucose forecast network
//!
//! A stacked recurrent encoder reads the glucose history one reading at a
//! time. Its final hidden state is joined with the static patient features
//! and passed through a small feed-forward head that emits the forecast.
//!
//! The network is a pure function of its parameters: no I/O happens in
//! [`GlucoseLstm::forward`], and in [`Mode::Inference`] the output is fully
//! deterministic.

mod layers;
mod weights;

pub use layers::{Dropout, Linear, LstmLayer};
pub use weights::{read_weights, write_weights, TensorMap, WeightsFile};

use layers::relu;
use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayView3, Axis, Ix1, Ix2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use thiserror::Error;

/// Each timestep of the history is a single reading
pub const INPUT_CHANNELS: usize = 1;

/// Width of the hidden layer in the prediction head
pub const HEAD_WIDTH: usize = 64;

/// Dropout probability in the prediction head (training mode only)
pub const HEAD_DROPOUT: f32 = 0.2;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read weights file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid weights data: {0}")]
    Format(String),

    #[error("tensor '{0}' not found in weights")]
    MissingTensor(String),

    #[error("unexpected tensor '{0}' in weights")]
    UnexpectedTensor(String),

    #[error("tensor '{name}' has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("tensor '{name}' has dtype {dtype}, expected F32")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("input '{name}' has shape {actual:?}, expected {expected:?}")]
    InputShape {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Evaluation mode of the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Stochastic regularization active
    Training,
    /// Deterministic evaluation
    Inference,
}

/// Architecture parameters, fixed at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Number of historical readings consumed per example
    pub seq_len: usize,
    /// Width of each recurrent layer's hidden state
    pub hidden_size: usize,
    /// Number of stacked recurrent layers
    pub num_layers: usize,
    /// Number of static patient features
    pub static_input_size: usize,
    /// Number of future readings produced
    pub pred_len: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seq_len: 36,
            hidden_size: 64,
            num_layers: 2,
            static_input_size: 5,
            pred_len: 6,
        }
    }
}

impl ModelConfig {
    /// Name and shape of every parameter tensor this architecture needs
    pub fn parameter_shapes(&self) -> Vec<(String, Vec<usize>)> {
        let gates = 4 * self.hidden_size;
        let mut shapes = Vec::with_capacity(4 * self.num_layers + 4);

        for layer in 0..self.num_layers {
            let input = if layer == 0 {
                INPUT_CHANNELS
            } else {
                self.hidden_size
            };
            shapes.push((format!("lstm.weight_ih_l{}", layer), vec![gates, input]));
            shapes.push((format!("lstm.weight_hh_l{}", layer), vec![gates, self.hidden_size]));
            shapes.push((format!("lstm.bias_ih_l{}", layer), vec![gates]));
            shapes.push((format!("lstm.bias_hh_l{}", layer), vec![gates]));
        }

        shapes.push((
            "fc.0.weight".to_string(),
            vec![HEAD_WIDTH, self.hidden_size + self.static_input_size],
        ));
        shapes.push(("fc.0.bias".to_string(), vec![HEAD_WIDTH]));
        shapes.push(("fc.3.weight".to_string(), vec![self.pred_len, HEAD_WIDTH]));
        shapes.push(("fc.3.bias".to_string(), vec![self.pred_len]));

        shapes
    }

    /// Uniform init bound for a parameter, `1 / sqrt(fan_in)`
    fn init_bound(&self, name: &str) -> f32 {
        let fan_in = if name.starts_with("lstm.") {
            self.hidden_size
        } else if name.starts_with("fc.0.") {
            self.hidden_size + self.static_input_size
        } else {
            HEAD_WIDTH
        };
        1.0 / (fan_in as f32).sqrt()
    }
}

/// Recurrent encoder plus feed-forward head
#[derive(Debug, Clone)]
pub struct GlucoseLstm {
    config: ModelConfig,
    layers: Vec<LstmLayer>,
    fc_in: Linear,
    dropout: Dropout,
    fc_out: Linear,
    mode: Mode,
}

impl GlucoseLstm {
    /// Build the network from named parameter tensors.
    ///
    /// Matching is strict: every tensor in [`ModelConfig::parameter_shapes`]
    /// must be present with exactly that shape, and no other tensors may be
    /// present. The returned model starts in [`Mode::Training`].
    pub fn from_tensors(config: ModelConfig, mut tensors: TensorMap) -> Result<Self, ModelError> {
        let mut layers = Vec::with_capacity(config.num_layers);
        for layer in 0..config.num_layers {
            let input = if layer == 0 {
                INPUT_CHANNELS
            } else {
                config.hidden_size
            };
            let gates = 4 * config.hidden_size;
            layers.push(LstmLayer::new(
                take_matrix(&mut tensors, &format!("lstm.weight_ih_l{}", layer), gates, input)?,
                take_matrix(
                    &mut tensors,
                    &format!("lstm.weight_hh_l{}", layer),
                    gates,
                    config.hidden_size,
                )?,
                take_vector(&mut tensors, &format!("lstm.bias_ih_l{}", layer), gates)?,
                take_vector(&mut tensors, &format!("lstm.bias_hh_l{}", layer), gates)?,
            ));
        }

        let fc_in = Linear::new(
            take_matrix(
                &mut tensors,
                "fc.0.weight",
                HEAD_WIDTH,
                config.hidden_size + config.static_input_size,
            )?,
            take_vector(&mut tensors, "fc.0.bias", HEAD_WIDTH)?,
        );
        let fc_out = Linear::new(
            take_matrix(&mut tensors, "fc.3.weight", config.pred_len, HEAD_WIDTH)?,
            take_vector(&mut tensors, "fc.3.bias", config.pred_len)?,
        );

        if let Some(name) = tensors.keys().next() {
            return Err(ModelError::UnexpectedTensor(name.clone()));
        }

        Ok(Self {
            config,
            layers,
            fc_in,
            dropout: Dropout::new(HEAD_DROPOUT),
            fc_out,
            mode: Mode::Training,
        })
    }

    /// Build a randomly initialized network; the same seed gives the same
    /// parameters.
    pub fn random(config: ModelConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let tensors: TensorMap = config
            .parameter_shapes()
            .into_iter()
            .map(|(name, shape)| {
                let bound = config.init_bound(&name);
                let count: usize = shape.iter().product();
                let values: Vec<f32> = (0..count).map(|_| rng.gen_range(-bound..=bound)).collect();
                let array = ArrayD::from_shape_vec(shape, values)
                    .expect("parameter shape matches generated value count");
                (name, array)
            })
            .collect();

        Self::from_tensors(config, tensors).expect("generated tensors match the architecture")
    }

    /// Export every parameter under its layer name
    pub fn to_tensors(&self) -> TensorMap {
        let mut tensors = TensorMap::new();
        for (index, layer) in self.layers.iter().enumerate() {
            tensors.insert(format!("lstm.weight_ih_l{}", index), layer.weight_ih.clone().into_dyn());
            tensors.insert(format!("lstm.weight_hh_l{}", index), layer.weight_hh.clone().into_dyn());
            tensors.insert(format!("lstm.bias_ih_l{}", index), layer.bias_ih.clone().into_dyn());
            tensors.insert(format!("lstm.bias_hh_l{}", index), layer.bias_hh.clone().into_dyn());
        }
        tensors.insert("fc.0.weight".into(), self.fc_in.weight.clone().into_dyn());
        tensors.insert("fc.0.bias".into(), self.fc_in.bias.clone().into_dyn());
        tensors.insert("fc.3.weight".into(), self.fc_out.weight.clone().into_dyn());
        tensors.insert("fc.3.bias".into(), self.fc_out.bias.clone().into_dyn());
        tensors
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Enable stochastic regularization
    pub fn train(&mut self) {
        self.mode = Mode::Training;
    }

    /// Switch to deterministic evaluation
    pub fn eval(&mut self) {
        self.mode = Mode::Inference;
    }

    /// Map a batch of histories and static features to forecasts.
    ///
    /// * `x_seq` - `[batch, seq_len, 1]`
    /// * `x_static` - `[batch, static_input_size]`
    ///
    /// Returns `[batch, pred_len]`. Output values are unconstrained.
    pub fn forward(
        &self,
        x_seq: ArrayView3<f32>,
        x_static: ArrayView2<f32>,
    ) -> Result<Array2<f32>, ModelError> {
        let batch = x_seq.len_of(Axis(0));
        let expected_seq = [batch, self.config.seq_len, INPUT_CHANNELS];
        if x_seq.shape() != expected_seq {
            return Err(ModelError::InputShape {
                name: "x_seq",
                expected: expected_seq.to_vec(),
                actual: x_seq.shape().to_vec(),
            });
        }
        let expected_static = [batch, self.config.static_input_size];
        if x_static.shape() != expected_static {
            return Err(ModelError::InputShape {
                name: "x_static",
                expected: expected_static.to_vec(),
                actual: x_static.shape().to_vec(),
            });
        }

        let mut output = Array2::<f32>::zeros((batch, self.config.pred_len));
        for (b, (sequence, features)) in x_seq
            .outer_iter()
            .zip(x_static.outer_iter())
            .enumerate()
        {
            let mut states = sequence.to_owned();
            for layer in &self.layers {
                states = layer.forward(states.view());
            }
            let h_last = states.row(self.config.seq_len - 1);

            let combined: Array1<f32> = ndarray::concatenate(Axis(0), &[h_last, features.view()])
                .map_err(|e| ModelError::Format(e.to_string()))?;

            let hidden = self.fc_in.forward(combined.view()).mapv_into(relu);
            let hidden = self.dropout.forward(hidden, self.mode);
            output.row_mut(b).assign(&self.fc_out.forward(hidden.view()));
        }

        Ok(output)
    }
}

fn take_tensor(
    tensors: &mut TensorMap,
    name: &str,
    expected: &[usize],
) -> Result<ArrayD<f32>, ModelError> {
    let tensor = tensors
        .remove(name)
        .ok_or_else(|| ModelError::MissingTensor(name.to_string()))?;
    if tensor.shape() != expected {
        return Err(ModelError::ShapeMismatch {
            name: name.to_string(),
            expected: expected.to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }
    Ok(tensor)
}

fn take_matrix(
    tensors: &mut TensorMap,
    name: &str,
    rows: usize,
    cols: usize,
) -> Result<Array2<f32>, ModelError> {
    take_tensor(tensors, name, &[rows, cols])?
        .into_dimensionality::<Ix2>()
        .map_err(|e| ModelError::Format(format!("tensor '{}': {}", name, e)))
}

fn take_vector(tensors: &mut TensorMap, name: &str, len: usize) -> Result<Array1<f32>, ModelError> {
    take_tensor(tensors, name, &[len])?
        .into_dimensionality::<Ix1>()
        .map_err(|e| ModelError::Format(format!("tensor '{}': {}", name, e)))
}
