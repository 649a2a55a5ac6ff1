//! Dependency tree expansion
//!
//! Roots are expanded depth first through their handlers. Every key is
//! expanded at most once per builder: a later occurrence of an expanded key
//! becomes an association (kept as a leaf, not included), and a key already
//! on the current path is a cycle and is cut the same way.

use crate::error::DeployResult;
use crate::handler::HandlerRegistry;
use crate::models::Dependency;
use crate::services::SecurityToken;
use std::collections::HashSet;
use tracing::{debug, info};

pub struct DependencyTreeBuilder<'a> {
    reg: &'a HandlerRegistry,
    tok: &'a SecurityToken,
    visited: HashSet<String>,
}

impl<'a> DependencyTreeBuilder<'a> {
    pub fn new(reg: &'a HandlerRegistry, tok: &'a SecurityToken) -> Self {
        Self {
            reg,
            tok,
            visited: HashSet::new(),
        }
    }

    /// Expand every root; keys shared between roots are expanded once
    pub fn build_all(&mut self, roots: Vec<Dependency>) -> DeployResult<Vec<Dependency>> {
        let roots = roots
            .into_iter()
            .map(|root| self.build(root))
            .collect::<DeployResult<Vec<_>>>()?;
        info!(
            "Expanded {} roots into {} dependencies",
            roots.len(),
            self.visited.len()
        );
        Ok(roots)
    }

    /// Expand one root; system roots are returned as they are
    pub fn build(&mut self, mut root: Dependency) -> DeployResult<Dependency> {
        if root.is_system() {
            return Ok(root);
        }
        let mut path = Vec::new();
        self.expand(&mut root, &mut path)?;
        Ok(root)
    }

    fn expand(&mut self, dep: &mut Dependency, path: &mut Vec<String>) -> DeployResult<()> {
        let key = dep.key();
        self.visited.insert(key.clone());
        path.push(key);

        let mut children = self.reg.get_child_dependencies(self.tok, dep)?;
        for child in children.iter_mut() {
            let child_key = child.key();
            if path.contains(&child_key) {
                debug!("Cut cycle at {} under {}", child_key, dep.key());
                mark_association(child);
                continue;
            }
            if self.visited.contains(&child_key) {
                mark_association(child);
                continue;
            }
            if child.auto_expand && !child.is_system() {
                self.expand(child, path)?;
            } else {
                self.visited.insert(child_key);
            }
        }
        dep.set_children(children);

        path.pop();
        Ok(())
    }
}

fn mark_association(dep: &mut Dependency) {
    dep.is_association = true;
    dep.is_included = false;
    dep.children = None;
}
