//! Entries whose capabilities are declared instead of typed.
//!
//! Backends written outside this crate (scripts, RPC plugins) can't
//! implement the contract traits in a way the resolver could inspect.
//! They declare a table of `action name -> MethodSignature` when the entry
//! is built; that table is the only thing action resolution looks at.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    Attributes, BlockReadable, Cached, Deletable, Entry, Execable, Group, MethodSignature,
    Readable, Resource, Signalable, Streamable, Writable,
};

/// Wraps an entry with a declared action/signature table.
///
/// Operations are forwarded to the wrapped entry. The table is never
/// checked against what the wrapped entry actually implements: if it
/// declares an action the inner entry can't serve, invoking it fails at
/// call time.
pub struct ExternalEntry {
    inner: Arc<dyn Entry>,
    signatures: BTreeMap<String, MethodSignature>,
}

impl ExternalEntry {
    pub fn new<I, S>(inner: Arc<dyn Entry>, declared: I) -> Self
    where
        I: IntoIterator<Item = (S, MethodSignature)>,
        S: Into<String>,
    {
        Self {
            inner,
            signatures: declared
                .into_iter()
                .map(|(name, signature)| (name.into(), signature))
                .collect(),
        }
    }

    /// Declare each of `methods` with [`MethodSignature::Default`].
    pub fn from_methods<I, S>(inner: Arc<dyn Entry>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            inner,
            methods
                .into_iter()
                .map(|name| (name, MethodSignature::Default)),
        )
    }

    /// The declared signature for `action`; undeclared actions are
    /// unsupported.
    pub fn method_signature(&self, action: &str) -> MethodSignature {
        self.signatures
            .get(action)
            .copied()
            .unwrap_or(MethodSignature::Unsupported)
    }

    pub fn declared(&self) -> &BTreeMap<String, MethodSignature> {
        &self.signatures
    }

    pub fn inner(&self) -> &Arc<dyn Entry> {
        &self.inner
    }
}

impl Entry for ExternalEntry {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn attributes(&self) -> Attributes {
        self.inner.attributes()
    }

    fn as_group(&self) -> Option<&dyn Group> {
        self.inner.as_group()
    }

    fn as_resource(&self) -> Option<&dyn Resource> {
        self.inner.as_resource()
    }

    fn as_readable(&self) -> Option<&dyn Readable> {
        self.inner.as_readable()
    }

    fn as_block_readable(&self) -> Option<&dyn BlockReadable> {
        self.inner.as_block_readable()
    }

    fn as_writable(&self) -> Option<&dyn Writable> {
        self.inner.as_writable()
    }

    fn as_execable(&self) -> Option<&dyn Execable> {
        self.inner.as_execable()
    }

    fn as_streamable(&self) -> Option<&dyn Streamable> {
        self.inner.as_streamable()
    }

    fn as_deletable(&self) -> Option<&dyn Deletable> {
        self.inner.as_deletable()
    }

    fn as_signalable(&self) -> Option<&dyn Signalable> {
        self.inner.as_signalable()
    }

    fn as_cached(&self) -> Option<&dyn Cached> {
        self.inner.as_cached()
    }

    fn as_external(&self) -> Option<&ExternalEntry> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEntry;
    use crate::{Action, Context};

    #[test]
    fn undeclared_actions_are_unsupported() {
        let external = ExternalEntry::new(
            Arc::new(MockEntry::builder("vm").build()),
            [("read", MethodSignature::BlockAddressable)],
        );
        assert_eq!(
            external.method_signature("read"),
            MethodSignature::BlockAddressable
        );
        assert_eq!(external.method_signature("exec"), MethodSignature::Unsupported);
        assert_eq!(external.name(), "vm");
    }

    #[test]
    fn declaration_wins_over_inner_contracts() {
        let inner = Arc::new(MockEntry::builder("dir").children(vec![]).build());
        let external = ExternalEntry::from_methods(inner, Vec::<String>::new());
        assert!(external.as_group().is_some());
        assert!(!Action::LIST.is_supported_on(&external));
    }

    #[test]
    fn outer_table_wins_when_nested() {
        let innermost = ExternalEntry::from_methods(
            Arc::new(MockEntry::builder("x").build()),
            ["delete"],
        );
        let outer = ExternalEntry::from_methods(Arc::new(innermost), ["signal"]);
        assert!(Action::SIGNAL.is_supported_on(&outer));
        assert!(!Action::DELETE.is_supported_on(&outer));
    }

    #[tokio::test]
    async fn operations_forward_to_the_inner_entry() {
        let child: Arc<dyn Entry> = Arc::new(MockEntry::builder("child").build());
        let inner = Arc::new(MockEntry::builder("dir").children(vec![child]).build());
        let external = ExternalEntry::from_methods(inner, ["list"]);

        let children = external
            .as_group()
            .unwrap()
            .list(&Context::new())
            .await
            .unwrap();
        assert_eq!(children[0].name(), "child");
    }
}
