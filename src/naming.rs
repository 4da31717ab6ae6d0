//! Resource names.
//!
//! Subsystems are named `subsystems/<id>`. Controllers and namespaces live
//! under their subsystem: `subsystems/<sid>/controllers/<id>` and
//! `subsystems/<sid>/namespaces/<id>`.

use bridge_common::utils::IdUtils;
use bridge_common::{
    BridgeError, Result, CONTROLLERS_SEGMENT, NAMESPACES_SEGMENT, SUBSYSTEMS_SEGMENT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Subsystem,
    Controller,
    Namespace,
}

impl ResourceKind {
    pub fn segment(self) -> &'static str {
        match self {
            ResourceKind::Subsystem => SUBSYSTEMS_SEGMENT,
            ResourceKind::Controller => CONTROLLERS_SEGMENT,
            ResourceKind::Namespace => NAMESPACES_SEGMENT,
        }
    }
}

/// Validate a caller-supplied id, or generate one when none was given
pub fn resource_id(supplied: &str) -> Result<String> {
    if supplied.is_empty() {
        return Ok(IdUtils::generate());
    }
    if !IdUtils::is_valid(supplied) {
        return Err(BridgeError::InvalidArgument(format!(
            "user-settable ID must only contain lowercase, numbers and hyphens (got: '{}')",
            supplied
        )));
    }
    Ok(supplied.to_string())
}

/// Build the full name of a new resource.
///
/// Controllers and namespaces need the id of their subsystem.
pub fn new_name(kind: ResourceKind, parent_subsystem_id: Option<&str>, supplied_id: &str) -> Result<String> {
    let id = resource_id(supplied_id)?;
    match (kind, parent_subsystem_id) {
        (ResourceKind::Subsystem, _) => Ok(subsystem_name(&id)),
        (_, Some(parent)) => Ok(child_name(parent, kind, &id)),
        (_, None) => Err(BridgeError::InvalidArgument(
            "missing required field: parent".to_string(),
        )),
    }
}

pub fn subsystem_name(id: &str) -> String {
    format!("{}/{}", SUBSYSTEMS_SEGMENT, id)
}

fn child_name(subsystem_id: &str, kind: ResourceKind, id: &str) -> String {
    format!("{}/{}/{}", subsystem_name(subsystem_id), kind.segment(), id)
}

/// Id of a subsystem given its full name
pub fn subsystem_id(name: &str) -> Result<&str> {
    match name.split('/').collect::<Vec<_>>().as_slice() {
        [SUBSYSTEMS_SEGMENT, id] if !id.is_empty() => Ok(*id),
        _ => Err(BridgeError::InvalidArgument(format!(
            "invalid subsystem name: {}",
            name
        ))),
    }
}

/// Id of the subsystem owning a controller or namespace
pub fn parent_subsystem_id(name: &str) -> Option<&str> {
    match name.split('/').collect::<Vec<_>>().as_slice() {
        [SUBSYSTEMS_SEGMENT, parent, kind, id]
            if !parent.is_empty()
                && !id.is_empty()
                && (*kind == CONTROLLERS_SEGMENT || *kind == NAMESPACES_SEGMENT) =>
        {
            Some(*parent)
        }
        _ => None,
    }
}

/// Full name of the subsystem owning a controller or namespace
pub fn parent_subsystem_name(name: &str) -> Option<String> {
    parent_subsystem_id(name).map(subsystem_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplied_ids() {
        assert_eq!(
            new_name(ResourceKind::Subsystem, None, "subsys-0").unwrap(),
            "subsystems/subsys-0"
        );
        assert_eq!(
            new_name(ResourceKind::Controller, Some("subsys-0"), "ctrl-1").unwrap(),
            "subsystems/subsys-0/controllers/ctrl-1"
        );
        assert_eq!(
            new_name(ResourceKind::Namespace, Some("subsys-0"), "ns-1").unwrap(),
            "subsystems/subsys-0/namespaces/ns-1"
        );
    }

    #[test]
    fn test_invalid_id() {
        let err = new_name(ResourceKind::Subsystem, None, "Bad_Id").unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidArgument(
                "user-settable ID must only contain lowercase, numbers and hyphens (got: 'Bad_Id')".into()
            )
        );
    }

    #[test]
    fn test_generated_id() {
        let name = new_name(ResourceKind::Namespace, Some("s1"), "").unwrap();
        let id = name.rsplit('/').next().unwrap();
        assert!(name.starts_with("subsystems/s1/namespaces/"));
        assert!(IdUtils::is_valid(id));
    }

    #[test]
    fn test_child_without_parent() {
        assert!(new_name(ResourceKind::Controller, None, "c1").is_err());
    }

    #[test]
    fn test_parent_extraction_inverts_naming() {
        let ctrl = new_name(ResourceKind::Controller, Some("subsys-9"), "c").unwrap();
        let ns = new_name(ResourceKind::Namespace, Some("subsys-9"), "n").unwrap();
        assert_eq!(parent_subsystem_id(&ctrl), Some("subsys-9"));
        assert_eq!(parent_subsystem_id(&ns), Some("subsys-9"));
        assert_eq!(parent_subsystem_name(&ns).as_deref(), Some("subsystems/subsys-9"));

        assert_eq!(parent_subsystem_id("subsystems/subsys-9"), None);
        assert_eq!(parent_subsystem_id("subsystems/s/volumes/v"), None);
    }

    #[test]
    fn test_subsystem_id() {
        assert_eq!(subsystem_id("subsystems/abc").unwrap(), "abc");
        assert!(subsystem_id("subsystems/").is_err());
        assert!(subsystem_id("abc").is_err());
        assert!(subsystem_id("subsystems/abc/controllers/c").is_err());
    }
}
