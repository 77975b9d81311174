//! Macros for defining typed resource handles.

/// Macro to define a typed handle for one resource type.
///
/// This generates a newtype wrapper around [`LogicalId`](crate::LogicalId) with:
/// - A `RESOURCE_TYPE` constant (the template type string)
/// - `new()` from an already validated logical id
/// - `parse()` from a string
/// - `Display`, `FromStr`, `Serialize` and `Deserialize` implementations
/// - A [`ResourceHandle`](crate::ResourceHandle) implementation, which provides
///   `reference()` and `attribute()`
///
/// # Example
///
/// ```ignore
/// define_handle!(BucketHandle, "AWS::S3::Bucket");
///
/// let bucket = BucketHandle::parse("DeployBucket")?;
/// assert_eq!(bucket.reference(), serde_json::json!({"Ref": "DeployBucket"}));
/// ```
#[macro_export]
macro_rules! define_handle {
    ($name:ident, $resource_type:literal) => {
        #[doc = concat!("Typed handle to a `", $resource_type, "` resource.")]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::LogicalId);

        impl $name {
            /// The template type string for this handle.
            pub const RESOURCE_TYPE: &'static str = $resource_type;

            /// Wraps an already validated logical id.
            #[must_use]
            pub fn new(id: $crate::LogicalId) -> Self {
                Self(id)
            }

            /// Parses a handle from a logical id string.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                $crate::LogicalId::parse(s).map(Self)
            }

            /// Returns the logical id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl $crate::ResourceHandle for $name {
            const RESOURCE_TYPE: &'static str = $resource_type;

            fn logical_id(&self) -> &$crate::LogicalId {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serde::Serialize::serialize(&self.0, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                <$crate::LogicalId as serde::Deserialize>::deserialize(deserializer).map(Self)
            }
        }

        impl AsRef<$crate::LogicalId> for $name {
            fn as_ref(&self) -> &$crate::LogicalId {
                &self.0
            }
        }
    };
}
