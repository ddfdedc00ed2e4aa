use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One comment node. Root comments live at `comments/{bookKey}/{id}`;
/// replies nest recursively under `comments` of their parent, keyed by
/// id in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    #[serde(default)]
    pub author_avatar: String,
    pub created_at: i64,
    #[serde(default)]
    pub likes: VoteMap,
    #[serde(default)]
    pub dislikes: VoteMap,
    #[serde(default)]
    pub comments: IndexMap<String, Comment>,
}

/// Payload for posting a comment or reply; identity fields come from
/// the session, never from the client body.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub text: String,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar: String,
}

/// Which way a vote went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

/// The set of user ids holding a vote on one comment.
///
/// Wire format quirk, preserved for compatibility with existing store
/// data: a populated set encodes as `{userId: true, ...}`, an empty set
/// encodes as the numeral `0`. The sentinel keeps "no voters" distinct
/// from "not yet loaded" in encodings where empty maps vanish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteMap(BTreeSet<String>);

impl VoteMap {
    pub fn contains(&self, user_id: &str) -> bool {
        self.0.contains(user_id)
    }

    pub fn insert(&mut self, user_id: &str) -> bool {
        self.0.insert(user_id.to_string())
    }

    pub fn remove(&mut self, user_id: &str) -> bool {
        self.0.remove(user_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[&str; N]> for VoteMap {
    fn from(users: [&str; N]) -> Self {
        Self(users.iter().map(|u| u.to_string()).collect())
    }
}

impl Serialize for VoteMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            return serializer.serialize_u64(0);
        }
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for user_id in &self.0 {
            map.serialize_entry(user_id, &true)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VoteMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VoteMapVisitor;

        impl<'de> Visitor<'de> for VoteMapVisitor {
            type Value = VoteMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of user ids to true, or the numeral 0")
            }

            fn visit_u64<E: serde::de::Error>(self, _: u64) -> Result<Self::Value, E> {
                Ok(VoteMap::default())
            }

            fn visit_i64<E: serde::de::Error>(self, _: i64) -> Result<Self::Value, E> {
                Ok(VoteMap::default())
            }

            fn visit_f64<E: serde::de::Error>(self, _: f64) -> Result<Self::Value, E> {
                Ok(VoteMap::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut users = BTreeSet::new();
                while let Some((user_id, voted)) = access.next_entry::<String, bool>()? {
                    if voted {
                        users.insert(user_id);
                    }
                }
                Ok(VoteMap(users))
            }
        }

        deserializer.deserialize_any(VoteMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_votes_encode_as_the_zero_sentinel() {
        let value = serde_json::to_value(VoteMap::default()).unwrap();
        assert_eq!(value, json!(0));
    }

    #[test]
    fn populated_votes_encode_as_a_true_map() {
        let votes = VoteMap::from(["u1", "u2"]);
        let value = serde_json::to_value(&votes).unwrap();
        assert_eq!(value, json!({"u1": true, "u2": true}));
    }

    #[test]
    fn sentinel_and_map_both_decode() {
        let empty: VoteMap = serde_json::from_value(json!(0)).unwrap();
        assert!(empty.is_empty());

        let votes: VoteMap = serde_json::from_value(json!({"u1": true, "u2": false})).unwrap();
        assert!(votes.contains("u1"));
        // `false` entries never count as votes.
        assert!(!votes.contains("u2"));
        assert_eq!(votes.len(), 1);
    }

    #[test]
    fn comment_defaults_tolerate_sparse_store_records() {
        let value = json!({
            "id": "c1",
            "text": "great pick",
            "author_id": "u1",
            "author_name": "Ada",
            "created_at": 1000,
            "likes": 0,
            "dislikes": 0,
        });
        let comment: Comment = serde_json::from_value(value).unwrap();
        assert!(comment.likes.is_empty());
        assert!(comment.comments.is_empty());
        assert_eq!(comment.author_avatar, "");
    }

    #[test]
    fn nested_replies_keep_insertion_order() {
        let value = json!({
            "id": "c1",
            "text": "root",
            "author_id": "u1",
            "author_name": "Ada",
            "created_at": 1000,
            "likes": 0,
            "dislikes": 0,
            "comments": {
                "c2": {
                    "id": "c2", "text": "first reply", "author_id": "u2",
                    "author_name": "Grace", "created_at": 1001,
                    "likes": 0, "dislikes": 0, "comments": {}
                },
                "c0": {
                    "id": "c0", "text": "second reply", "author_id": "u3",
                    "author_name": "Lin", "created_at": 1002,
                    "likes": 0, "dislikes": 0, "comments": {}
                }
            }
        });
        let comment: Comment = serde_json::from_value(value).unwrap();
        let ids: Vec<&str> = comment.comments.keys().map(String::as_str).collect();
        // "c2" was inserted first and stays first despite sorting lower.
        assert_eq!(ids, vec!["c2", "c0"]);
    }
}
