//! kubectl argument lists

use crate::backend::{ManifestApply, ManifestDelete};

/// `kubectl apply` (or `create`) reading the manifest from stdin
pub fn apply_args(request: &ManifestApply) -> Vec<String> {
    let verb = if request.use_create { "create" } else { "apply" };
    let mut args = vec![verb.to_string()];
    if let Some(namespace) = &request.namespace {
        args.push("--namespace".to_string());
        args.push(namespace.clone());
    }
    args.push("-f".to_string());
    args.push("-".to_string());
    args
}

/// `kubectl delete` of the resources in the manifest on stdin
pub fn delete_args(request: &ManifestDelete) -> Vec<String> {
    let mut args = vec!["delete".to_string()];
    if let Some(namespace) = &request.namespace {
        args.push("--namespace".to_string());
        args.push(namespace.clone());
    }
    if request.dry_run {
        args.push("--dry-run=client".to_string());
    }
    args.push("-f".to_string());
    args.push("-".to_string());
    args
}
