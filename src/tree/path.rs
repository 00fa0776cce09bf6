use std::fmt;

/// A root-to-node path of local names, used to label ancestors as
/// "changed" during diff marking (spec §4.2) without back-pointers —
/// per the design note in spec §9, parent lookups go through a path
/// walked from the root rather than child-to-parent pointers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root() -> Self { Self(vec![]) }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            let mut segments = self.0.clone();
            segments.pop();
            Some(Self(segments))
        }
    }

    pub fn ancestors(&self) -> impl Iterator<Item = NodePath> + '_ {
        let mut cur = Some(self.clone());
        std::iter::from_fn(move || {
            let this = cur.take()?;
            cur = this.parent();
            Some(this)
        })
    }

    pub fn segments(&self) -> &[String] { &self.0 }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}
