use std::collections::HashMap;
use std::fmt;

use audioplug_sys::{
    apk_parameter_info_t, APK_PARAM_CAN_AUTOMATE, APK_PARAM_IS_BYPASS, APK_PARAM_IS_LIST,
    APK_PARAM_READ_ONLY, APK_SHORT_STRING_SIZE, APK_STRING_SIZE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strings::{empty, read_c_string, write_c_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub u32);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ParameterFlags(i32);

impl ParameterFlags {
    pub const NONE: Self = Self(0);
    pub const CAN_AUTOMATE: Self = Self(APK_PARAM_CAN_AUTOMATE);
    pub const READ_ONLY: Self = Self(APK_PARAM_READ_ONLY);
    pub const IS_LIST: Self = Self(APK_PARAM_IS_LIST);
    pub const IS_BYPASS: Self = Self(APK_PARAM_IS_BYPASS);

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for ParameterFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Parameter description exchanged over the ABI. Values are normalized to
/// `[0, 1]`; `step_count == 0` means continuous.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub id: ParamId,
    pub title: String,
    pub units: String,
    pub step_count: i32,
    pub default_normalized: f64,
    pub flags: ParameterFlags,
}

impl ParameterInfo {
    pub fn is_bypass(&self) -> bool {
        self.flags.contains(ParameterFlags::IS_BYPASS)
    }

    pub fn is_read_only(&self) -> bool {
        self.flags.contains(ParameterFlags::READ_ONLY)
    }

    pub fn to_raw(&self) -> apk_parameter_info_t {
        let mut title = empty::<APK_STRING_SIZE>();
        write_c_string(&mut title, &self.title);
        let mut units = empty::<APK_SHORT_STRING_SIZE>();
        write_c_string(&mut units, &self.units);
        apk_parameter_info_t {
            id: self.id.0,
            title,
            units,
            step_count: self.step_count,
            default_normalized_value: self.default_normalized,
            flags: self.flags.bits(),
        }
    }

    pub fn from_raw(raw: &apk_parameter_info_t) -> Self {
        Self {
            id: ParamId(raw.id),
            title: read_c_string(&raw.title),
            units: read_c_string(&raw.units),
            step_count: raw.step_count,
            default_normalized: raw.default_normalized_value,
            flags: ParameterFlags::from_bits(raw.flags),
        }
    }
}

/// Plug-in side definition of a parameter in plain units.
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    pub id: ParamId,
    pub name: String,
    pub kind: ParameterKind,
    pub unit: Option<String>,
    pub flags: ParameterFlags,
}

impl ParameterDefinition {
    pub fn new(id: u32, name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            id: ParamId(id),
            name: name.into(),
            kind,
            unit: None,
            flags: ParameterFlags::CAN_AUTOMATE,
        }
    }

    pub fn bypass(id: u32) -> Self {
        Self::new(id, "Bypass", ParameterKind::Toggle { default: false })
            .with_flags(ParameterFlags::CAN_AUTOMATE | ParameterFlags::IS_BYPASS)
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_flags(mut self, flags: ParameterFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn info(&self) -> ParameterInfo {
        let mut flags = self.flags;
        if matches!(self.kind, ParameterKind::Choice { .. }) {
            flags = flags | ParameterFlags::IS_LIST;
        }
        ParameterInfo {
            id: self.id,
            title: self.name.clone(),
            units: self.unit.clone().unwrap_or_default(),
            step_count: self.kind.step_count(),
            default_normalized: self.kind.default_normalized(),
            flags,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ParameterKind {
    Continuous(ContinuousParameterOptions),
    Toggle { default: bool },
    Choice { options: Vec<String>, default: usize },
}

impl ParameterKind {
    pub fn continuous(range: std::ops::RangeInclusive<f64>, default: f64) -> Self {
        Self::Continuous(ContinuousParameterOptions::new(range, default))
    }

    pub fn step_count(&self) -> i32 {
        match self {
            ParameterKind::Continuous(_) => 0,
            ParameterKind::Toggle { .. } => 1,
            ParameterKind::Choice { options, .. } => {
                i32::try_from(options.len().saturating_sub(1)).unwrap_or(i32::MAX)
            }
        }
    }

    pub fn default_plain(&self) -> f64 {
        match self {
            ParameterKind::Continuous(opts) => opts.default,
            ParameterKind::Toggle { default } => f64::from(u8::from(*default)),
            ParameterKind::Choice { default, .. } => *default as f64,
        }
    }

    pub fn default_normalized(&self) -> f64 {
        self.to_normalized(self.default_plain())
    }

    pub fn to_plain(&self, normalized: f64) -> f64 {
        let normalized = normalized.clamp(0.0, 1.0);
        match self {
            ParameterKind::Continuous(opts) => {
                let shaped = match opts.skew {
                    Some(skew) => normalized.powf(1.0 / skew),
                    None => normalized,
                };
                opts.min + shaped * (opts.max - opts.min)
            }
            ParameterKind::Toggle { .. } => {
                if normalized >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParameterKind::Choice { options, .. } => {
                let steps = options.len().saturating_sub(1) as f64;
                (normalized * steps).round()
            }
        }
    }

    pub fn to_normalized(&self, plain: f64) -> f64 {
        match self {
            ParameterKind::Continuous(opts) => {
                let span = opts.max - opts.min;
                if span <= 0.0 {
                    return 0.0;
                }
                let linear = ((plain - opts.min) / span).clamp(0.0, 1.0);
                match opts.skew {
                    Some(skew) => linear.powf(skew),
                    None => linear,
                }
            }
            ParameterKind::Toggle { .. } => {
                if plain >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ParameterKind::Choice { options, .. } => {
                let steps = options.len().saturating_sub(1) as f64;
                if steps == 0.0 {
                    0.0
                } else {
                    (plain.round() / steps).clamp(0.0, 1.0)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContinuousParameterOptions {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Exponent applied between the linear plain range and the normalized
    /// value. Values below 1 spend more of the range on low values.
    pub skew: Option<f64>,
}

impl ContinuousParameterOptions {
    pub fn new(range: std::ops::RangeInclusive<f64>, default: f64) -> Self {
        let min = *range.start();
        let max = *range.end();
        assert!(min <= max, "parameter min must be <= max");
        assert!(default >= min && default <= max, "default outside range");
        Self {
            min,
            max,
            default,
            skew: None,
        }
    }

    pub fn with_skew(mut self, skew: f64) -> Self {
        assert!(skew > 0.0, "skew must be positive");
        self.skew = Some(skew);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterLayout {
    parameters: Vec<ParameterDefinition>,
}

impl ParameterLayout {
    pub fn new(parameters: Vec<ParameterDefinition>) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    pub fn find(&self, id: ParamId) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|definition| definition.id == id)
    }

    pub fn bypass(&self) -> Option<&ParameterDefinition> {
        self.parameters
            .iter()
            .find(|definition| definition.flags.contains(ParameterFlags::IS_BYPASS))
    }
}

/// Normalized parameter values keyed by id.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    layout: ParameterLayout,
    values: HashMap<ParamId, f64>,
}

impl ParameterSet {
    pub fn new(layout: ParameterLayout) -> Self {
        let values = layout
            .parameters()
            .iter()
            .map(|parameter| (parameter.id, parameter.kind.default_normalized()))
            .collect();
        Self { layout, values }
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    pub fn normalized(&self, id: ParamId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn plain(&self, id: ParamId) -> Option<f64> {
        let definition = self.layout.find(id)?;
        Some(definition.kind.to_plain(self.normalized(id)?))
    }

    pub fn set_normalized(&mut self, id: ParamId, value: f64) -> Result<(), PluginParameterError> {
        if self.layout.find(id).is_none() {
            return Err(PluginParameterError::UnknownParameter(id));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PluginParameterError::OutOfRange { id, value });
        }
        self.values.insert(id, value);
        Ok(())
    }

    pub fn is_bypassed(&self) -> bool {
        self.layout
            .bypass()
            .and_then(|definition| self.normalized(definition.id))
            .map(|value| value >= 0.5)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, f64)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PluginParameterError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(ParamId),
    #[error("parameter `{id}` received normalized value {value} outside of 0..=1")]
    OutOfRange { id: ParamId, value: f64 },
    #[error("parameter `{0}` is read-only")]
    ReadOnly(ParamId),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn layout() -> ParameterLayout {
        ParameterLayout::new(vec![
            ParameterDefinition::new(0, "Cutoff", ParameterKind::Continuous(
                ContinuousParameterOptions::new(20.0..=20_000.0, 1_000.0).with_skew(0.3),
            ))
            .with_unit("Hz"),
            ParameterDefinition::new(
                1,
                "Mode",
                ParameterKind::Choice {
                    options: vec!["LP".into(), "BP".into(), "HP".into()],
                    default: 1,
                },
            ),
            ParameterDefinition::bypass(2),
        ])
    }

    #[test]
    fn normalized_round_trip() {
        let layout = layout();
        let cutoff = layout.find(ParamId(0)).unwrap();
        let normalized = cutoff.kind.to_normalized(440.0);
        assert!((cutoff.kind.to_plain(normalized) - 440.0).abs() < 1e-6);

        let mode = layout.find(ParamId(1)).unwrap();
        assert_eq!(mode.kind.default_normalized(), 0.5);
        assert_eq!(mode.kind.to_plain(1.0), 2.0);
        assert_eq!(mode.info().step_count, 2);
        assert!(mode.info().flags.contains(ParameterFlags::IS_LIST));
    }

    #[test]
    fn set_rejects_unknown_and_out_of_range() {
        let mut set = ParameterSet::new(layout());
        assert_eq!(
            set.set_normalized(ParamId(9), 0.5),
            Err(PluginParameterError::UnknownParameter(ParamId(9)))
        );
        assert_eq!(
            set.set_normalized(ParamId(0), 1.5),
            Err(PluginParameterError::OutOfRange {
                id: ParamId(0),
                value: 1.5
            })
        );
        assert!(!set.is_bypassed());
        set.set_normalized(ParamId(2), 1.0).unwrap();
        assert!(set.is_bypassed());
    }
}
