//! Error conversion from engine error types.
//!
//! Maps `CortexError` to the executor's [`Error`], choosing the not-found
//! variant from the typed `EntityRef` of the missing record.

use crate::Error;
use cortex_core::{CortexError, EntityRef};

impl From<CortexError> for Error {
    fn from(err: CortexError) -> Self {
        match err {
            CortexError::NotFound { entity_ref } => {
                let entity = entity_ref.to_string();
                match &entity_ref {
                    EntityRef::MemorySpace { .. } => Error::SpaceNotFound { space: entity },
                    EntityRef::Participant { .. } => Error::ParticipantNotFound {
                        participant: entity,
                    },
                    EntityRef::Conversation { .. } => Error::ConversationNotFound {
                        conversation: entity,
                    },
                    EntityRef::Message { .. } => Error::MessageNotFound { message: entity },
                    EntityRef::Immutable { .. } => Error::RecordNotFound { record: entity },
                    EntityRef::Mutable { .. } => Error::KeyNotFound { key: entity },
                    EntityRef::Memory { .. } => Error::MemoryNotFound { memory: entity },
                    EntityRef::Fact { .. } => Error::FactNotFound { fact: entity },
                    EntityRef::Context { .. } => Error::ContextNotFound { context: entity },
                }
            }

            CortexError::AlreadyExists { entity_ref } => Error::AlreadyExists {
                entity: entity_ref.to_string(),
            },

            CortexError::PermissionDenied { reason } => Error::PermissionDenied { reason },

            CortexError::Validation { message } => Error::InvalidInput { reason: message },

            CortexError::TypeMismatch { expected, actual } => Error::WrongType { expected, actual },

            CortexError::Structural { reason } => Error::ConstraintViolation { reason },

            CortexError::VersionConflict {
                entity_ref,
                expected,
                actual,
            } => Error::VersionConflict {
                entity: entity_ref.to_string(),
                expected,
                actual,
            },

            CortexError::Conflict { reason } => Error::Conflict { reason },

            CortexError::Serialization { message } => Error::Serialization { reason: message },
        }
    }
}

/// Convert a `CortexResult` to an executor Result.
pub fn convert_result<T>(result: cortex_core::CortexResult<T>) -> crate::Result<T> {
    result.map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::{MemorySpaceId, Scope};

    #[test]
    fn test_not_found_by_entity() {
        let space = MemorySpaceId::from("team-a");
        let err: Error = CortexError::not_found(EntityRef::mutable(&space, "ns", "mykey")).into();
        match err {
            Error::KeyNotFound { key } => assert!(key.contains("mykey")),
            other => panic!("Expected KeyNotFound, got {:?}", other),
        }

        let err: Error = CortexError::not_found(EntityRef::context("ctx-1")).into();
        assert!(matches!(err, Error::ContextNotFound { .. }));

        let err: Error =
            CortexError::not_found(EntityRef::immutable(&Scope::Global, "policy", "p1")).into();
        assert!(matches!(err, Error::RecordNotFound { .. }));
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_version_conflict() {
        let space = MemorySpaceId::from("team-a");
        let err: Error = CortexError::version_conflict(EntityRef::memory(&space, "m1"), 5, 6).into();
        match err {
            Error::VersionConflict {
                entity,
                expected,
                actual,
            } => {
                assert_eq!(entity, "memory://team-a/m1");
                assert_eq!(expected, 5);
                assert_eq!(actual, 6);
            }
            other => panic!("Expected VersionConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_codes_line_up() {
        let cases = [
            (CortexError::invalid_input("bad"), "VALIDATION_ERROR"),
            (CortexError::permission_denied("no"), "PERMISSION_DENIED"),
            (CortexError::structural("cycle"), "STRUCTURAL_ERROR"),
            (CortexError::type_mismatch("number", "string"), "TYPE_MISMATCH"),
            (CortexError::conflict("read set changed"), "CONFLICT"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code().as_str(), code);
            assert_eq!(Error::from(err).code(), code);
        }
    }

    #[test]
    fn test_error_serializes_with_tag() {
        let err = Error::InvalidInput {
            reason: "empty".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "invalid_input");
        assert_eq!(json["reason"], "empty");
    }
}
