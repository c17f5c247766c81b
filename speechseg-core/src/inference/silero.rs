//! `SpeechScorer` over a Silero VAD ONNX export.
//!
//! The model family is read off the graph's tensor names when the session
//! is loaded: `h`/`c` in and `hn`/`cn` out select [`ModelVariant::Lstm`], a
//! single `state`/`stateN` pair selects [`ModelVariant::Unified`].
//!
//! ## Model I/O (v4 LSTM)
//!
//! | Name     | Shape      | DType | Direction |
//! |----------|------------|-------|-----------|
//! | `input`  | `[1, N]`   | f32   | in        |
//! | `sr`     | `[1]`      | i64   | in        |
//! | `h`      | `[2,1,64]` | f32   | in        |
//! | `c`      | `[2,1,64]` | f32   | in        |
//! | `output` | `[1, 1]`   | f32   | out       |
//! | `hn`     | `[2,1,64]` | f32   | out       |
//! | `cn`     | `[2,1,64]` | f32   | out       |
//!
//! ## Model I/O (v5)
//!
//! | Name     | Shape       | DType | Direction |
//! |----------|-------------|-------|-----------|
//! | `input`  | `[1, C+N]`  | f32   | in        |
//! | `state`  | `[2,1,128]` | f32   | in        |
//! | `sr`     | `[1]`       | i64   | in        |
//! | `output` | `[1, 1]`    | f32   | out       |
//! | `stateN` | `[2,1,128]` | f32   | out       |

use std::path::Path;

use ndarray::{Array1, Array2, Array3};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::{Session, SessionInputValue};
use ort::value::Value;
use tracing::info;

use super::{ModelVariant, RecurrentState, SpeechScorer};
use crate::error::{Result, SegmenterError};

/// Resolved tensor names for one model variant.
#[derive(Debug, Clone)]
enum StateNames {
    Lstm {
        h: String,
        c: String,
        hn: String,
        cn: String,
    },
    Unified {
        state: String,
        state_out: String,
    },
}

/// Silero VAD session with single-threaded execution.
pub struct SileroScorer {
    session: Session,
    input_name: String,
    sr_name: String,
    output_name: String,
    state_names: StateNames,
}

impl SileroScorer {
    /// Load the Silero VAD ONNX model from `path`.
    ///
    /// Intra- and inter-op parallelism are pinned to one thread so several
    /// detectors can run side by side without oversubscribing the CPU.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SegmenterError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let session = SessionBuilder::new()
            .map_err(session_err)?
            .with_intra_threads(1)
            .map_err(session_err)?
            .with_inter_threads(1)
            .map_err(session_err)?
            .with_optimization_level(GraphOptimizationLevel::All)
            .map_err(session_err)?
            .commit_from_file(path)
            .map_err(session_err)?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|outlet| outlet.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|outlet| outlet.name().to_string())
            .collect();

        let input_name = tensor_named(&input_names, &["input", "audio", "x"])
            .or_else(|| input_names.first().cloned())
            .ok_or_else(|| SegmenterError::OnnxSession("Silero model has no inputs".into()))?;
        let sr_name = tensor_named(&input_names, &["sr", "sample_rate"])
            .ok_or_else(|| SegmenterError::OnnxSession("Silero model has no `sr` input".into()))?;
        let output_name = tensor_named(&output_names, &["output", "speech_prob", "prob"])
            .or_else(|| output_names.first().cloned())
            .ok_or_else(|| SegmenterError::OnnxSession("Silero model has no outputs".into()))?;

        let state_names = detect_state_names(&input_names, &output_names)?;

        let variant = variant_of(&state_names);
        info!(
            model = %path.display(),
            ?variant,
            state_len = variant.state_len(),
            input = %input_name,
            output = %output_name,
            "silero scorer loaded"
        );

        Ok(Self {
            session,
            input_name,
            sr_name,
            output_name,
            state_names,
        })
    }
}

fn detect_state_names(inputs: &[String], outputs: &[String]) -> Result<StateNames> {
    let lstm = (
        tensor_named(inputs, &["h", "state_h"]),
        tensor_named(inputs, &["c", "state_c"]),
        tensor_named(outputs, &["hn", "state_hn", "h_out"]),
        tensor_named(outputs, &["cn", "state_cn", "c_out"]),
    );
    if let (Some(h), Some(c), Some(hn), Some(cn)) = lstm {
        return Ok(StateNames::Lstm { h, c, hn, cn });
    }

    let unified = (
        tensor_named(inputs, &["state", "h_0", "hidden"]),
        tensor_named(outputs, &["stateN", "state_out", "h_0_out", "hn_out"]),
    );
    if let (Some(state), Some(state_out)) = unified {
        return Ok(StateNames::Unified { state, state_out });
    }

    Err(SegmenterError::OnnxSession(format!(
        "unrecognised Silero state tensors (inputs: {inputs:?}, outputs: {outputs:?})"
    )))
}

fn variant_of(names: &StateNames) -> ModelVariant {
    match names {
        StateNames::Lstm { .. } => ModelVariant::Lstm,
        StateNames::Unified { .. } => ModelVariant::Unified,
    }
}

/// First tensor in `names` matching one of `aliases`, in alias order.
fn tensor_named(names: &[String], aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| names.iter().find(|n| n.eq_ignore_ascii_case(alias)))
        .cloned()
}

fn session_err(e: impl std::fmt::Display) -> SegmenterError {
    SegmenterError::OnnxSession(e.to_string())
}

fn onnx_err(e: impl std::fmt::Display) -> SegmenterError {
    SegmenterError::Inference(e.to_string())
}

fn state_tensor(data: &[f32], units: usize) -> Result<Value> {
    let arr = Array3::<f32>::from_shape_vec((2, 1, units), data.to_vec()).map_err(onnx_err)?;
    Ok(Value::from_array(arr).map_err(onnx_err)?.into_dyn())
}

fn copy_state(dst: &mut [f32], src: &[f32], name: &str) -> Result<()> {
    if dst.len() != src.len() {
        return Err(SegmenterError::Inference(format!(
            "output `{name}` has {} elements, expected {}",
            src.len(),
            dst.len()
        )));
    }
    dst.copy_from_slice(src);
    Ok(())
}

impl SpeechScorer for SileroScorer {
    fn variant(&self) -> ModelVariant {
        variant_of(&self.state_names)
    }

    fn infer(
        &mut self,
        window: &[f32],
        sample_rate: u32,
        state: &mut RecurrentState,
    ) -> Result<f32> {
        let input_arr =
            Array2::<f32>::from_shape_vec((1, window.len()), window.to_vec()).map_err(onnx_err)?;
        let input_val = Value::from_array(input_arr).map_err(onnx_err)?;
        let sr_val =
            Value::from_array(Array1::<i64>::from_elem(1, i64::from(sample_rate))).map_err(onnx_err)?;

        let mut input_values: Vec<(String, SessionInputValue<'_>)> = vec![
            (self.input_name.clone(), input_val.into()),
            (self.sr_name.clone(), sr_val.into()),
        ];

        match (&self.state_names, &*state) {
            (StateNames::Lstm { h: h_name, c: c_name, .. }, RecurrentState::Paired { h, c }) => {
                input_values.push((h_name.clone(), state_tensor(h, 64)?.into()));
                input_values.push((c_name.clone(), state_tensor(c, 64)?.into()));
            }
            (StateNames::Unified { state: name, .. }, RecurrentState::Unified(data)) => {
                input_values.push((name.clone(), state_tensor(data, 128)?.into()));
            }
            (names, other) => {
                return Err(SegmenterError::Inference(format!(
                    "recurrent state {:?} does not match model variant {:?}",
                    other.variant(),
                    variant_of(names)
                )));
            }
        }

        let outputs = self.session.run(input_values).map_err(onnx_err)?;

        let prob_output = outputs
            .get(self.output_name.as_str())
            .unwrap_or(&outputs[0]);
        let (_, prob_data) = prob_output.try_extract_tensor::<f32>().map_err(onnx_err)?;
        let prob = prob_data
            .first()
            .copied()
            .ok_or_else(|| SegmenterError::Inference("empty probability tensor".into()))?;

        let missing = |name: &str| SegmenterError::Inference(format!("missing output `{name}`"));
        match (&self.state_names, state) {
            (StateNames::Lstm { hn, cn, .. }, RecurrentState::Paired { h, c }) => {
                let hn_out = outputs.get(hn.as_str()).ok_or_else(|| missing(hn))?;
                let cn_out = outputs.get(cn.as_str()).ok_or_else(|| missing(cn))?;
                let (_, hn_data) = hn_out.try_extract_tensor::<f32>().map_err(onnx_err)?;
                let (_, cn_data) = cn_out.try_extract_tensor::<f32>().map_err(onnx_err)?;
                copy_state(h, hn_data, hn)?;
                copy_state(c, cn_data, cn)?;
            }
            (StateNames::Unified { state_out, .. }, RecurrentState::Unified(data)) => {
                let out = outputs
                    .get(state_out.as_str())
                    .ok_or_else(|| missing(state_out))?;
                let (_, state_data) = out.try_extract_tensor::<f32>().map_err(onnx_err)?;
                copy_state(data, state_data, state_out)?;
            }
            (names, other) => {
                return Err(SegmenterError::Inference(format!(
                    "recurrent state {:?} does not match model variant {:?}",
                    other.variant(),
                    variant_of(names)
                )));
            }
        }

        Ok(prob)
    }
}
