//! Experimental cross-linking measurements.
//!
//! A dataset is an ordered list of observations `(L0, Y, v)`: ligand
//! concentration, measured response and ligand valency. It is read once from a
//! delimited text table and never mutated; resampling builds new datasets
//! through [`Dataset::select`] and [`Dataset::without`].

use std::fs;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};

/// One experimental condition and its measured response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Ligand concentration `L0`
    pub concentration: f64,

    /// Measured response `Y`
    pub response: f64,

    /// Ligand valency `v`
    pub valency: u32,
}

/// An immutable table of observations stored column-wise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    concentrations: Array1<f64>,
    responses: Array1<f64>,
    valencies: Array1<u32>,
}

impl Dataset {
    /// Build a dataset from observations.
    ///
    /// Fails if any value is non-finite or a valency is zero.
    pub fn new(observations: &[Observation]) -> Result<Self> {
        for (i, obs) in observations.iter().enumerate() {
            validate(obs).map_err(|message| BindingError::InvalidInput(format!(
                "observation {}: {}",
                i, message
            )))?;
        }

        Ok(Self {
            concentrations: observations.iter().map(|o| o.concentration).collect(),
            responses: observations.iter().map(|o| o.response).collect(),
            valencies: observations.iter().map(|o| o.valency).collect(),
        })
    }

    /// Build a dataset from parallel columns.
    pub fn from_columns(
        concentrations: Array1<f64>,
        responses: Array1<f64>,
        valencies: Array1<u32>,
    ) -> Result<Self> {
        let n = concentrations.len();
        if responses.len() != n || valencies.len() != n {
            return Err(BindingError::DimensionMismatch(format!(
                "column lengths differ: {} concentrations, {} responses, {} valencies",
                n,
                responses.len(),
                valencies.len()
            )));
        }

        let observations: Vec<Observation> = (0..n)
            .map(|i| Observation {
                concentration: concentrations[i],
                response: responses[i],
                valency: valencies[i],
            })
            .collect();
        Self::new(&observations)
    }

    /// Read a dataset from a delimited text file.
    ///
    /// See [`Dataset::parse`] for the accepted format.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a delimited table with three numeric columns per row:
    /// concentration, response, valency.
    ///
    /// Fields may be separated by commas, semicolons, tabs or spaces. Blank
    /// lines and lines starting with `#` are skipped. There is no header row.
    pub fn parse(text: &str) -> Result<Self> {
        let mut observations = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|f| !f.is_empty())
                .collect();
            if fields.len() != 3 {
                return Err(BindingError::Parse {
                    line,
                    message: format!("expected 3 columns, found {}", fields.len()),
                });
            }

            let number = |field: &str, name: &str| -> Result<f64> {
                field.parse::<f64>().map_err(|e| BindingError::Parse {
                    line,
                    message: format!("invalid {} '{}': {}", name, field, e),
                })
            };

            let concentration = number(fields[0], "concentration")?;
            let response = number(fields[1], "response")?;
            let valency = parse_valency(number(fields[2], "valency")?).ok_or_else(|| {
                BindingError::Parse {
                    line,
                    message: format!("valency '{}' is not a positive integer", fields[2]),
                }
            })?;

            let obs = Observation {
                concentration,
                response,
                valency,
            };
            validate(&obs).map_err(|message| BindingError::Parse { line, message })?;
            observations.push(obs);
        }

        Self::new(&observations)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether the dataset has no observations.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Ligand concentrations.
    pub fn concentrations(&self) -> &Array1<f64> {
        &self.concentrations
    }

    /// Measured responses.
    pub fn responses(&self) -> &Array1<f64> {
        &self.responses
    }

    /// Ligand valencies.
    pub fn valencies(&self) -> &Array1<u32> {
        &self.valencies
    }

    /// The observation at `index`, if present.
    pub fn get(&self, index: usize) -> Option<Observation> {
        (index < self.len()).then(|| Observation {
            concentration: self.concentrations[index],
            response: self.responses[index],
            valency: self.valencies[index],
        })
    }

    /// Iterate over observations in order.
    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// A new dataset made of the observations at `indices`, repeats allowed.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let observations = indices
            .iter()
            .map(|&i| {
                self.get(i).ok_or_else(|| {
                    BindingError::InvalidInput(format!(
                        "index {} out of range for {} observations",
                        i,
                        self.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(&observations)
    }

    /// A new dataset without the observation at `index`.
    pub fn without(&self, index: usize) -> Result<Self> {
        if index >= self.len() {
            return Err(BindingError::InvalidInput(format!(
                "index {} out of range for {} observations",
                index,
                self.len()
            )));
        }
        let kept: Vec<usize> = (0..self.len()).filter(|&i| i != index).collect();
        self.select(&kept)
    }

    /// The same conditions with the responses replaced.
    pub fn with_responses(&self, responses: Array1<f64>) -> Result<Self> {
        Self::from_columns(
            self.concentrations.clone(),
            responses,
            self.valencies.clone(),
        )
    }
}

fn parse_valency(value: f64) -> Option<u32> {
    if value.fract() == 0.0 && value >= 1.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

fn validate(obs: &Observation) -> std::result::Result<(), String> {
    if !obs.concentration.is_finite() {
        return Err(format!("concentration {} is not finite", obs.concentration));
    }
    if !obs.response.is_finite() {
        return Err(format!("response {} is not finite", obs.response));
    }
    if obs.valency == 0 {
        return Err("valency must be at least 1".to_string());
    }
    Ok(())
}
