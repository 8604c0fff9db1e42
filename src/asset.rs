// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed assets extracted from bundles

use crate::error::{BundleError, Result};

/// Trait for assets that can be extracted from a bundle
pub trait Asset: Sized + Send + Sync + 'static {
    /// Type tag stored alongside the asset bytes in a bundle archive
    const TYPE_TAG: &'static str;

    /// Decode asset from bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

/// Simple binary data asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryAsset {
    pub data: Vec<u8>,
}

impl Asset for BinaryAsset {
    const TYPE_TAG: &'static str = "Binary";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(BinaryAsset {
            data: bytes.to_vec(),
        })
    }
}

/// Text asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextAsset {
    pub content: String,
}

impl Asset for TextAsset {
    const TYPE_TAG: &'static str = "Text";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let content = String::from_utf8(bytes.to_vec())
            .map_err(|e| BundleError::Decode(format!("UTF-8 decode error: {e}")))?;
        Ok(TextAsset { content })
    }
}

/// JSON data asset
#[derive(Clone, Debug, PartialEq)]
pub struct JsonAsset {
    pub value: serde_json::Value,
}

impl Asset for JsonAsset {
    const TYPE_TAG: &'static str = "Json";

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| BundleError::Decode(format!("JSON parse error: {e}")))?;
        Ok(JsonAsset { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_asset_rejects_invalid_utf8() {
        assert!(TextAsset::from_bytes(&[0xff, 0xfe]).is_err());
        let text = TextAsset::from_bytes(b"hello").unwrap();
        assert_eq!(text.content, "hello");
    }

    #[test]
    fn test_json_asset() {
        let json = JsonAsset::from_bytes(br#"{"hp": 10}"#).unwrap();
        assert_eq!(json.value["hp"], 10);
        assert!(matches!(
            JsonAsset::from_bytes(b"{not json"),
            Err(BundleError::Decode(_))
        ));
    }
}
