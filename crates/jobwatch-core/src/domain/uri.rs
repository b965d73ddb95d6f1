//! Remote addresses of the form `scheme://bucket/key`.

use std::fmt;

use crate::error::{JobwatchError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteUri {
    scheme: String,
    bucket: String,
    key: String,
}

impl RemoteUri {
    /// Parse `raw`, accepting only `expected_scheme`.
    ///
    /// Nothing here touches the network: a malformed URI is rejected up front.
    pub fn parse(raw: &str, expected_scheme: &str) -> Result<Self> {
        let malformed = |why: &str| JobwatchError::Configuration(format!("uri {raw:?}: {why}"));

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| malformed("missing scheme separator"))?;
        if scheme != expected_scheme {
            return Err(malformed(&format!(
                "scheme {scheme:?} is not {expected_scheme:?}"
            )));
        }
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| malformed("missing object key"))?;
        if bucket.is_empty() {
            return Err(malformed("empty bucket"));
        }
        if key.is_empty() {
            return Err(malformed("empty object key"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn splits_bucket_from_nested_key() {
        let uri = RemoteUri::parse("s3://lab-bucket/group/results/job/cert.txt", "s3").unwrap();
        assert_eq!(uri.bucket(), "lab-bucket");
        assert_eq!(uri.key(), "group/results/job/cert.txt");
        assert_eq!(uri.to_string(), "s3://lab-bucket/group/results/job/cert.txt");
    }

    #[rstest]
    #[case::no_scheme("lab-bucket/key")]
    #[case::wrong_scheme("gs://lab-bucket/key")]
    #[case::no_key("s3://lab-bucket")]
    #[case::empty_key("s3://lab-bucket/")]
    #[case::empty_bucket("s3:///key")]
    fn malformed_uris_are_rejected(#[case] raw: &str) {
        let err = RemoteUri::parse(raw, "s3").unwrap_err();
        assert!(matches!(err, JobwatchError::Configuration(_)));
    }
}
