//! UD feature strings
//!
//! Decoding of `Key=Value|Key=Value` strings into feature maps, and the
//! subset test used to match a token's features against lexicon entries.

use std::collections::BTreeMap;

/// Morphological (or MISC) feature map. Ordered so serialization is canonical.
pub type Features = BTreeMap<String, String>;

/// The UD null marker
pub const EMPTY_FIELD: &str = "_";

/// Decode a UD feature string.
///
/// `"_"` decodes to an empty map. If any `|`-separated pair does not contain
/// exactly one `=`, the whole string is treated as malformed and an empty map
/// is returned.
pub fn decode(feature_string: &str) -> Features {
    let mut feats = Features::new();
    if feature_string == EMPTY_FIELD {
        return feats;
    }

    for pair in feature_string.split('|') {
        let mut parts = pair.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                feats.insert(key.to_string(), value.to_string());
            }
            _ => {
                log::debug!("malformed feature string: {:?}", feature_string);
                return Features::new();
            }
        }
    }

    feats
}

/// Encode a feature map, `"_"` when empty
pub fn encode(feats: &Features) -> String {
    if feats.is_empty() {
        return EMPTY_FIELD.to_string();
    }
    feats
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("|")
}

/// True iff every key of `required` is present in `candidate` with the same value
#[inline]
pub fn subset_match(required: &Features, candidate: &Features) -> bool {
    required
        .iter()
        .all(|(k, v)| candidate.get(k).is_some_and(|c| c == v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feats(pairs: &[(&str, &str)]) -> Features {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_decode_null_marker() {
        assert!(decode("_").is_empty());
    }

    #[test]
    fn test_decode_pairs() {
        let decoded = decode("Number=Sing|Case=Nom");
        assert_eq!(decoded, feats(&[("Number", "Sing"), ("Case", "Nom")]));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode("Number=Sing|Case").is_empty());
        assert!(decode("Number=Sing=Plur").is_empty());
        assert!(decode("").is_empty());
        // glued pairs from a broken source row
        assert!(decode("Number=SingGender=Masc").is_empty());
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(&Features::new()), "_");
        assert_eq!(
            encode(&feats(&[("Number", "Sing"), ("Case", "Nom")])),
            "Case=Nom|Number=Sing"
        );
    }

    #[test]
    fn test_subset_match() {
        assert!(subset_match(&Features::new(), &Features::new()));
        assert!(subset_match(
            &feats(&[("A", "1")]),
            &feats(&[("A", "1"), ("B", "2")])
        ));
        assert!(!subset_match(&feats(&[("A", "1")]), &feats(&[("A", "2")])));
        assert!(!subset_match(&feats(&[("A", "1")]), &Features::new()));
    }

    proptest! {
        #[test]
        fn test_decode_is_total(s in ".*") {
            let _ = decode(&s);
        }

        #[test]
        fn test_empty_requirement_always_matches(
            keys in proptest::collection::vec("[A-Za-z]{1,8}", 0..6),
            values in proptest::collection::vec("[A-Za-z0-9]{1,8}", 0..6),
        ) {
            let candidate: Features = keys.into_iter().zip(values).collect();
            prop_assert!(subset_match(&Features::new(), &candidate));
        }
    }
}
