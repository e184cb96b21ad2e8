//! A small convolutional scorer with weights loaded from JSON.
//!
//! The board is encoded as 12 one-hot planes of 8×8 (white pawn, knight,
//! bishop, rook, queen, king, then the same for black). Row 0 is rank 8 and
//! column 0 is the a-file, so plane rows read like a diagram seen from White.

use std::fs;
use std::path::Path;

use atomic_rules::AtomicPosition;
use chess_core::Color;
use chess_engine::Position;
use serde::{Deserialize, Serialize};

use super::{terminal_score, EvalError, Evaluator};

pub const PLANES: usize = 12;
const CELLS: usize = 64;
const KERNEL: usize = 3;

fn default_scale() -> f32 {
    1000.0
}

/// Raw network weights as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvWeights {
    /// `[channel][plane][row][col]` kernels for the 3×3 convolution.
    pub conv: Vec<Vec<Vec<Vec<f32>>>>,
    /// One bias per channel.
    pub conv_bias: Vec<f32>,
    /// Dense weights over the flattened `[channel][row][col]` activations.
    pub dense: Vec<f32>,
    pub dense_bias: f32,
    /// Multiplies the `tanh` output to get centipawns.
    #[serde(default = "default_scale")]
    pub scale: f32,
}

/// Evaluator running [`ConvWeights`] over the occupancy planes.
#[derive(Debug, Clone)]
pub struct ConvScorer {
    channels: usize,
    kernels: Vec<f32>,
    conv_bias: Vec<f32>,
    dense: Vec<f32>,
    dense_bias: f32,
    scale: f32,
}

impl ConvScorer {
    /// Checks every shape and flattens the kernels.
    pub fn new(weights: ConvWeights) -> Result<Self, EvalError> {
        let channels = weights.conv.len();
        if channels == 0 {
            return Err(EvalError::Shape("no convolution channels".to_string()));
        }
        if weights.conv_bias.len() != channels {
            return Err(EvalError::Shape(format!(
                "conv_bias has {} entries, expected {}",
                weights.conv_bias.len(),
                channels
            )));
        }
        if weights.dense.len() != channels * CELLS {
            return Err(EvalError::Shape(format!(
                "dense has {} entries, expected {}",
                weights.dense.len(),
                channels * CELLS
            )));
        }

        let mut kernels = Vec::with_capacity(channels * PLANES * KERNEL * KERNEL);
        for (c, channel) in weights.conv.iter().enumerate() {
            if channel.len() != PLANES {
                return Err(EvalError::Shape(format!(
                    "channel {} has {} planes, expected {}",
                    c,
                    channel.len(),
                    PLANES
                )));
            }
            for kernel in channel {
                if kernel.len() != KERNEL || kernel.iter().any(|row| row.len() != KERNEL) {
                    return Err(EvalError::Shape(format!("channel {} kernel is not 3x3", c)));
                }
                kernels.extend(kernel.iter().flatten().copied());
            }
        }

        Ok(ConvScorer {
            channels,
            kernels,
            conv_bias: weights.conv_bias,
            dense: weights.dense,
            dense_bias: weights.dense_bias,
            scale: weights.scale,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, EvalError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EvalError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// White-relative centipawns for a board.
    pub fn score_white(&self, position: &Position) -> Result<i32, EvalError> {
        let input = encode(position);
        let mut output = self.dense_bias;

        for c in 0..self.channels {
            for row in 0..8 {
                for col in 0..8 {
                    let activation = self.convolve(&input, c, row, col).max(0.0);
                    output += activation * self.dense[c * CELLS + row * 8 + col];
                }
            }
        }

        let score = output.tanh() * self.scale;
        if !score.is_finite() {
            return Err(EvalError::NonFinite);
        }
        Ok(score.round() as i32)
    }

    fn convolve(&self, input: &[f32], channel: usize, row: usize, col: usize) -> f32 {
        let mut sum = self.conv_bias[channel];
        for plane in 0..PLANES {
            let base = (channel * PLANES + plane) * KERNEL * KERNEL;
            for kr in 0..KERNEL {
                let r = row + kr;
                // Same padding: input row r - 1, skipped when off the board.
                if r == 0 || r > 8 {
                    continue;
                }
                for kc in 0..KERNEL {
                    let f = col + kc;
                    if f == 0 || f > 8 {
                        continue;
                    }
                    sum += input[plane * CELLS + (r - 1) * 8 + (f - 1)]
                        * self.kernels[base + kr * KERNEL + kc];
                }
            }
        }
        sum
    }
}

impl Evaluator for ConvScorer {
    fn name(&self) -> &str {
        "conv"
    }

    fn evaluate(&self, position: &AtomicPosition, perspective: Color) -> Result<i32, EvalError> {
        if let Some(score) = terminal_score(position.status(), perspective) {
            return Ok(score);
        }
        Ok(perspective.sign() * self.score_white(position.position())?)
    }
}

/// One-hot occupancy planes, `[plane][row][col]` flattened.
pub fn encode(position: &Position) -> Vec<f32> {
    let mut planes = vec![0.0; PLANES * CELLS];
    for sq in position.occupied() {
        if let Some((piece, color)) = position.piece_at(sq) {
            let plane = color.index() * 6 + piece.index();
            let row = 7 - sq.rank().index() as usize;
            let col = sq.file().index() as usize;
            planes[plane * CELLS + row * 8 + col] = 1.0;
        }
    }
    planes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zero_weights(channels: usize) -> ConvWeights {
        ConvWeights {
            conv: vec![vec![vec![vec![0.0; 3]; 3]; PLANES]; channels],
            conv_bias: vec![0.0; channels],
            dense: vec![0.0; channels * CELLS],
            dense_bias: 0.0,
            scale: 1000.0,
        }
    }

    /// One channel whose centre tap counts pieces of `plane`.
    fn counting_weights(plane: usize, dense: f32) -> ConvWeights {
        let mut weights = zero_weights(1);
        weights.conv[0][plane][1][1] = 1.0;
        weights.dense = vec![dense; CELLS];
        weights
    }

    #[test]
    fn encoding_layout() {
        let planes = encode(&Position::startpos());
        assert_eq!(planes.iter().filter(|&&v| v == 1.0).count(), 32);
        // White king on e1: plane 5, row 7, col 4.
        assert_eq!(planes[5 * CELLS + 7 * 8 + 4], 1.0);
        // Black rook on a8: plane 9, row 0, col 0.
        assert_eq!(planes[9 * CELLS], 1.0);
        // Black pawn on h7: plane 6, row 1, col 7.
        assert_eq!(planes[6 * CELLS + 8 + 7], 1.0);
    }

    #[test]
    fn zero_network_scores_zero() {
        let scorer = ConvScorer::new(zero_weights(2)).unwrap();
        assert_eq!(scorer.channels(), 2);
        assert_eq!(scorer.score_white(&Position::startpos()).unwrap(), 0);
    }

    #[test]
    fn counts_white_pawns() {
        // Eight pawns at 0.05 each: 1000 * tanh(0.4).
        let scorer = ConvScorer::new(counting_weights(0, 0.05)).unwrap();
        let expected = (0.4f32.tanh() * 1000.0).round() as i32;
        assert_eq!(scorer.score_white(&Position::startpos()).unwrap(), expected);

        let position = AtomicPosition::new();
        assert_eq!(scorer.evaluate(&position, Color::Black).unwrap(), -expected);
    }

    #[test]
    fn edge_padding_ignores_off_board() {
        // A full kernel on the white rook plane: the a1 rook is seen by the
        // four cells around it, the h1 rook likewise.
        let mut weights = zero_weights(1);
        weights.conv[0][3] = vec![vec![1.0; 3]; 3];
        weights.dense = vec![0.01; CELLS];
        let scorer = ConvScorer::new(weights).unwrap();
        let expected = (0.08f32.tanh() * 1000.0).round() as i32;
        assert_eq!(scorer.score_white(&Position::startpos()).unwrap(), expected);
    }

    #[test]
    fn rejects_bad_shapes() {
        let mut weights = zero_weights(1);
        weights.conv_bias.push(0.0);
        assert!(matches!(ConvScorer::new(weights), Err(EvalError::Shape(_))));

        let mut weights = zero_weights(1);
        weights.dense.pop();
        assert!(matches!(ConvScorer::new(weights), Err(EvalError::Shape(_))));

        let mut weights = zero_weights(1);
        weights.conv[0].pop();
        assert!(matches!(ConvScorer::new(weights), Err(EvalError::Shape(_))));

        let mut weights = zero_weights(1);
        weights.conv[0][0][2].push(0.0);
        assert!(matches!(ConvScorer::new(weights), Err(EvalError::Shape(_))));

        assert!(matches!(ConvScorer::new(zero_weights(0)), Err(EvalError::Shape(_))));
    }

    #[test]
    fn non_finite_output_is_an_error() {
        let mut weights = counting_weights(0, 1.0);
        weights.scale = f32::NAN;
        let scorer = ConvScorer::new(weights).unwrap();
        assert!(matches!(
            scorer.score_white(&Position::startpos()),
            Err(EvalError::NonFinite)
        ));
    }

    #[test]
    fn loads_from_file() {
        let json = serde_json::to_string(&counting_weights(0, 0.05)).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let scorer = ConvScorer::load(file.path()).unwrap();
        assert_eq!(scorer.name(), "conv");
        assert!(scorer.score_white(&Position::startpos()).unwrap() > 0);
    }

    #[test]
    fn scale_defaults_when_missing() {
        let mut value = serde_json::to_value(counting_weights(0, 0.05)).unwrap();
        value.as_object_mut().unwrap().remove("scale");
        let weights: ConvWeights = serde_json::from_value(value).unwrap();
        assert_eq!(weights.scale, 1000.0);
    }

    #[test]
    fn missing_file_and_bad_json() {
        assert!(matches!(
            ConvScorer::load("/nonexistent/weights.json"),
            Err(EvalError::Io(_))
        ));
        assert!(matches!(
            ConvScorer::from_json_str("{"),
            Err(EvalError::Json(_))
        ));
    }
}
