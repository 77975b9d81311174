//! The resource graph.

use std::collections::BTreeMap;

use fleetform_id::{LogicalId, ResourceHandle};
use serde::Serialize;
use serde_json::Value;

use crate::{Resource, TemplateDigest, TemplateError};

/// Template format version emitted in every template.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A named template output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

/// A complete resource graph, keyed by logical id.
///
/// Resources and outputs are stored in sorted maps so serialization is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: &'static str,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(rename = "Resources")]
    resources: BTreeMap<LogicalId, Resource>,

    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<LogicalId, Output>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// Create an empty template.
    pub fn new() -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION,
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a resource under a typed handle.
    ///
    /// Returns the handle back so builders can chain declarations. Declaring
    /// the same logical id twice, or a body whose type does not match the
    /// handle, is an error.
    pub fn declare<H: ResourceHandle>(
        &mut self,
        handle: H,
        resource: Resource,
    ) -> Result<H, TemplateError> {
        let id = handle.logical_id().clone();

        if resource.resource_type != H::RESOURCE_TYPE {
            return Err(TemplateError::TypeMismatch {
                id,
                expected: H::RESOURCE_TYPE,
                declared: resource.resource_type,
            });
        }

        if self.resources.contains_key(&id) {
            return Err(TemplateError::DuplicateLogicalId(id));
        }

        self.resources.insert(id, resource);
        Ok(handle)
    }

    /// Add a named output.
    pub fn output(
        &mut self,
        name: LogicalId,
        value: Value,
        description: Option<&str>,
    ) -> Result<(), TemplateError> {
        if self.outputs.contains_key(&name) {
            return Err(TemplateError::DuplicateLogicalId(name));
        }
        self.outputs.insert(
            name,
            Output {
                description: description.map(str::to_string),
                value,
            },
        );
        Ok(())
    }

    /// Move every resource and output of `other` into this template.
    ///
    /// Either everything is moved or, on a logical id clash, nothing is.
    pub fn absorb(&mut self, other: Template) -> Result<(), TemplateError> {
        if let Some(id) = other
            .resources
            .keys()
            .find(|id| self.resources.contains_key(*id))
            .or_else(|| other.outputs.keys().find(|id| self.outputs.contains_key(*id)))
        {
            return Err(TemplateError::DuplicateLogicalId(id.clone()));
        }

        self.resources.extend(other.resources);
        self.outputs.extend(other.outputs);
        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Look up a resource by logical id.
    pub fn resource(&self, id: &LogicalId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Look up the resource behind a typed handle.
    pub fn get<H: ResourceHandle>(&self, handle: &H) -> Option<&Resource> {
        self.resources.get(handle.logical_id())
    }

    /// Iterate resources in logical id order.
    pub fn resources(&self) -> impl Iterator<Item = (&LogicalId, &Resource)> {
        self.resources.iter()
    }

    /// Iterate resources of one type.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a LogicalId, &'a Resource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&LogicalId, &Output)> {
        self.outputs.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_value(&self) -> Result<Value, TemplateError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Content digest of the serialized template.
    pub fn digest(&self) -> Result<TemplateDigest, TemplateError> {
        Ok(TemplateDigest::from_json(&self.to_value()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetform_id::{BucketHandle, RuleHandle};
    use proptest::prelude::*;
    use serde_json::json;

    fn bucket(id: &str) -> BucketHandle {
        BucketHandle::parse(id).unwrap()
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut template = Template::new();
        let handle = template
            .declare(bucket("DeployBucket"), Resource::of::<BucketHandle>())
            .unwrap();

        assert_eq!(template.len(), 1);
        assert_eq!(
            template.get(&handle).unwrap().resource_type,
            "AWS::S3::Bucket"
        );
        assert!(template.resource(handle.logical_id()).is_some());
    }

    #[test]
    fn test_duplicate_logical_id_rejected() {
        let mut template = Template::new();
        template
            .declare(bucket("DeployBucket"), Resource::of::<BucketHandle>())
            .unwrap();

        let err = template
            .declare(bucket("DeployBucket"), Resource::of::<BucketHandle>())
            .unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateLogicalId(_)));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut template = Template::new();
        let err = template
            .declare(bucket("DeployBucket"), Resource::of::<RuleHandle>())
            .unwrap_err();
        assert!(matches!(
            err,
            TemplateError::TypeMismatch {
                expected: "AWS::S3::Bucket",
                ..
            }
        ));
        assert!(template.is_empty());
    }

    #[test]
    fn test_serialization_shape() {
        let mut template = Template::new().with_description("workers");
        let handle = template
            .declare(bucket("DeployBucket"), Resource::of::<BucketHandle>())
            .unwrap();
        template
            .output(
                LogicalId::parse("DeployBucketName").unwrap(),
                handle.reference(),
                None,
            )
            .unwrap();

        assert_eq!(
            template.to_value().unwrap(),
            json!({
                "AWSTemplateFormatVersion": "2010-09-09",
                "Description": "workers",
                "Resources": {"DeployBucket": {"Type": "AWS::S3::Bucket"}},
                "Outputs": {"DeployBucketName": {"Value": {"Ref": "DeployBucket"}}}
            })
        );
    }

    #[test]
    fn test_absorb_is_all_or_nothing() {
        let mut target = Template::new();
        target
            .declare(bucket("Shared"), Resource::of::<BucketHandle>())
            .unwrap();

        let mut clashing = Template::new();
        clashing
            .declare(bucket("Fresh"), Resource::of::<BucketHandle>())
            .unwrap();
        clashing
            .declare(bucket("Shared"), Resource::of::<BucketHandle>())
            .unwrap();

        let err = target.absorb(clashing).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateLogicalId(_)));
        assert_eq!(target.len(), 1);

        let mut fresh = Template::new();
        fresh
            .declare(bucket("Fresh"), Resource::of::<BucketHandle>())
            .unwrap();
        target.absorb(fresh).unwrap();
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_digest_independent_of_declaration_order() {
        let mut a = Template::new();
        a.declare(bucket("A"), Resource::of::<BucketHandle>()).unwrap();
        a.declare(bucket("B"), Resource::of::<BucketHandle>()).unwrap();

        let mut b = Template::new();
        b.declare(bucket("B"), Resource::of::<BucketHandle>()).unwrap();
        b.declare(bucket("A"), Resource::of::<BucketHandle>()).unwrap();

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_resources_of_type() {
        let mut template = Template::new();
        template
            .declare(bucket("A"), Resource::of::<BucketHandle>())
            .unwrap();
        template
            .declare(
                RuleHandle::parse("R").unwrap(),
                Resource::of::<RuleHandle>(),
            )
            .unwrap();

        let buckets: Vec<_> = template
            .resources_of_type(BucketHandle::RESOURCE_TYPE)
            .map(|(id, _)| id.as_str().to_string())
            .collect();
        assert_eq!(buckets, vec!["A"]);
    }

    proptest! {
        #[test]
        fn prop_absorb_succeeds_only_without_clashes(
            existing in proptest::collection::btree_set("[A-Z][a-z]{0,3}", 0..5),
            incoming in proptest::collection::btree_set("[A-Z][a-z]{0,3}", 0..5),
        ) {
            let mut target = Template::new();
            for id in &existing {
                target.declare(bucket(id), Resource::of::<BucketHandle>()).unwrap();
            }
            let mut other = Template::new();
            for id in &incoming {
                other.declare(bucket(id), Resource::of::<BucketHandle>()).unwrap();
            }
            let before = target.digest().unwrap();

            let clashes = existing.intersection(&incoming).next().is_some();
            let result = target.absorb(other);

            prop_assert_eq!(result.is_ok(), !clashes);
            if clashes {
                prop_assert_eq!(target.len(), existing.len());
                prop_assert_eq!(target.digest().unwrap(), before);
            } else {
                prop_assert_eq!(target.len(), existing.len() + incoming.len());
            }
        }
    }
}
