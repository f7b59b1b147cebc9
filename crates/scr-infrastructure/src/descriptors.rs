//! Component descriptor files
//!
//! Descriptors are TOML documents with one `[[component]]` table per
//! component type and `[[component.reference]]` tables for its references:
//!
//! ```toml
//! [[component]]
//! name = "org.fipro.inverter.consumer"
//! provides = ["org.fipro.inverter.Command"]
//!
//! [[component.reference]]
//! name = "inverter"
//! capability = "org.fipro.inverter.StringInverter"
//! target = "(fipro.language=en)"
//! ```

use crate::error_ext::ErrorContext;
use scr_application::ConditionGate;
use scr_domain::error::Result;
use scr_domain::filter::Filter;
use scr_domain::value_objects::ComponentDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A parsed descriptor file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorDocument {
    /// Component types in file order
    #[serde(default)]
    pub component: Vec<ComponentDescriptor>,
}

/// Parse descriptor TOML
///
/// # Errors
///
/// [`scr_domain::Error::Configuration`] when the text is not a valid
/// descriptor document.
pub fn parse_descriptors(text: &str, origin: &str) -> Result<Vec<ComponentDescriptor>> {
    let document: DescriptorDocument = toml::from_str(text)
        .config_context(format!("Invalid component descriptors in {origin}"))?;
    Ok(document.component)
}

/// Read and parse a descriptor file
///
/// # Errors
///
/// [`scr_domain::Error::Io`] when the file cannot be read, otherwise as
/// [`parse_descriptors`].
pub fn load_descriptor_file<P: AsRef<Path>>(path: P) -> Result<Vec<ComponentDescriptor>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .io_context(format!("Failed to read descriptor file {}", path.display()))?;
    let descriptors = parse_descriptors(&text, &path.display().to_string())?;
    debug!(path = %path.display(), count = descriptors.len(), "Descriptor file loaded");
    Ok(descriptors)
}

/// A problem found in a descriptor before loading it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorIssue {
    /// Component the issue belongs to
    pub component: String,
    /// What is wrong
    pub message: String,
}

impl fmt::Display for DescriptorIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.message)
    }
}

/// Check descriptors for problems that would make `load` reject them
///
/// Reports empty or duplicate component names, duplicate reference names,
/// and target or condition filters that do not parse.
pub fn validate_descriptors(descriptors: &[ComponentDescriptor]) -> Vec<DescriptorIssue> {
    let mut issues = Vec::new();
    let mut names = HashSet::new();
    for descriptor in descriptors {
        let mut issue = |message: String| {
            issues.push(DescriptorIssue {
                component: descriptor.name.clone(),
                message,
            });
        };
        if descriptor.name.trim().is_empty() {
            issue("component name is empty".to_string());
        } else if !names.insert(descriptor.name.as_str()) {
            issue("component name is declared more than once".to_string());
        }

        let mut references = HashSet::new();
        for reference in &descriptor.references {
            if !references.insert(reference.name.as_str()) {
                issue(format!("reference '{}' is declared more than once", reference.name));
            }
            if let Some(target) = &reference.target
                && let Err(err) = Filter::parse(target)
            {
                issue(format!("reference '{}': {}", reference.name, err));
            }
        }
        for condition in &descriptor.conditions {
            if let Err(err) = ConditionGate::parse_target(condition) {
                issue(format!("condition: {err}"));
            }
        }
    }
    issues
}
