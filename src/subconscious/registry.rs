use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::kernel::error::{CschError, Result};
use crate::model::{names, ParamValue, Params, SkillCall};

const COMPONENT: &str = "SkillRegistry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SkillCategory {
    Navigation,
    Combat,
    Mining,
    Crafting,
    Building,
    Survival,
    Exploration,
    Social,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamKind {
    Text,
    Float,
    Integer,
    Bool,
}

impl ParamKind {
    fn accepts(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (ParamKind::Text, ParamValue::Text(_)) => true,
            (ParamKind::Bool, ParamValue::Bool(_)) => true,
            (ParamKind::Float, ParamValue::Float(_) | ParamValue::Int(_)) => true,
            (ParamKind::Integer, v) => v.as_i64().is_some(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillParameter {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub range: Option<(f64, f64)>,
}

impl SkillParameter {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: true,
            default: None,
            range: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParamKind,
        default: impl Into<ParamValue>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            default: Some(default.into()),
            range: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    fn check(&self, skill: &str, value: &ParamValue) -> Result<()> {
        if !self.kind.accepts(value) {
            return Err(CschError::invalid_input(
                COMPONENT,
                format!("{skill}.{} expects {:?}, got {value}", self.name, self.kind),
            ));
        }
        if let (Some((min, max)), Some(v)) = (self.range, value.as_f64()) {
            if v < min || v > max {
                return Err(CschError::invalid_input(
                    COMPONENT,
                    format!("{skill}.{} = {v} outside [{min}, {max}]", self.name),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillDefinition {
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    pub parameters: Vec<SkillParameter>,
    pub estimated_duration: Duration,
    pub interruptible: bool,
}

impl SkillDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, category: SkillCategory) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            parameters: Vec::new(),
            estimated_duration: Duration::from_secs(5),
            interruptible: true,
        }
    }

    pub fn with_parameter(mut self, parameter: SkillParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = duration;
        self
    }

    pub fn with_interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&SkillParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Defaults of every optional parameter.
    pub fn defaults(&self) -> Params {
        self.parameters
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect()
    }
}

/// Catalogue of skills the executor knows how to run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    skills: BTreeMap<String, SkillDefinition>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any definition with the same name.
    pub fn register(&mut self, skill: SkillDefinition) -> Result<()> {
        if skill.name.trim().is_empty() {
            return Err(CschError::invalid_input(COMPONENT, "skill name must not be empty"));
        }
        self.skills.insert(skill.name.clone(), skill);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<SkillDefinition> {
        self.skills.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&SkillDefinition> {
        self.skills.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    pub fn by_category(&self, category: SkillCategory) -> Vec<&SkillDefinition> {
        self.skills.values().filter(|s| s.category == category).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn clear(&mut self) {
        self.skills.clear();
    }

    /// Checks a call against its definition: the skill must be registered,
    /// required parameters present, and values of the declared kind and range.
    pub fn validate(&self, call: &SkillCall) -> Result<()> {
        let definition = self.get(&call.skill_name).ok_or_else(|| {
            CschError::invalid_input(COMPONENT, format!("unknown skill {}", call.skill_name))
        })?;

        for parameter in &definition.parameters {
            match call.params.get(&parameter.name) {
                Some(value) => parameter.check(&definition.name, value)?,
                None if parameter.required => {
                    return Err(CschError::invalid_input(
                        COMPONENT,
                        format!("{} is missing required parameter {}", definition.name, parameter.name),
                    ))
                }
                None => {}
            }
        }
        Ok(())
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for skill in default_skills() {
            registry.skills.insert(skill.name.clone(), skill);
        }
        registry
    }
}

fn default_skills() -> Vec<SkillDefinition> {
    use ParamKind::*;

    vec![
        SkillDefinition::new(names::NAVIGATE_TO, "Navigate to a target location", SkillCategory::Navigation)
            .with_parameter(SkillParameter::required("target", Text, "target location id"))
            .with_parameter(SkillParameter::optional("speed", Float, 1.0, "movement speed").with_range(0.0, 2.0))
            .with_parameter(SkillParameter::optional("cautious", Bool, false, "cautious mode")),
        SkillDefinition::new(names::ALIGN_CROSSHAIR, "Aim at a target", SkillCategory::Combat)
            .with_parameter(SkillParameter::required("target", Text, "target id"))
            .with_parameter(
                SkillParameter::optional("tolerance", Float, 0.05, "alignment tolerance").with_range(0.01, 0.5),
            ),
        SkillDefinition::new(names::MINE, "Mine blocks", SkillCategory::Mining)
            .with_parameter(SkillParameter::required("resource", Text, "resource type"))
            .with_parameter(SkillParameter::optional("amount", Integer, 1, "amount").with_range(1.0, 64.0)),
        SkillDefinition::new(names::COMBAT_KITE, "Kite an enemy at a stand-off distance", SkillCategory::Combat)
            .with_parameter(SkillParameter::required("target", Text, "enemy id"))
            .with_parameter(
                SkillParameter::optional("distance", Float, 3.5, "stand-off distance").with_range(1.0, 10.0),
            ),
        SkillDefinition::new(names::ESCAPE, "Flee from danger", SkillCategory::Survival)
            .with_parameter(SkillParameter::required("threat", Text, "threat kind"))
            .with_parameter(
                SkillParameter::optional("minDistance", Float, 10.0, "minimum flee distance").with_range(5.0, 50.0),
            ),
        SkillDefinition::new(names::PLACE_TORCH, "Place torches", SkillCategory::Building)
            .with_parameter(SkillParameter::optional("interval", Integer, 7, "placement interval").with_range(1.0, 20.0)),
        SkillDefinition::new(names::DIG_TUNNEL, "Dig a tunnel", SkillCategory::Mining)
            .with_parameter(SkillParameter::required("direction", Text, "direction"))
            .with_parameter(SkillParameter::optional("length", Integer, 10, "tunnel length").with_range(1.0, 100.0)),
    ]
}
