use crate::address::Address;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A crawled page and the same-origin pages it links to, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageNode {
    pub address: Address,
    pub children: Vec<Address>,
}

impl PageNode {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            children: Vec::new(),
        }
    }
}

/// Page graph shared by the workers of one crawl.
///
/// Backed by a sharded map: a worker appending to its own node only locks the
/// shard holding that node, so workers on unrelated pages do not serialize.
#[derive(Debug, Default)]
pub struct PageGraph {
    nodes: DashMap<Address, GraphEntry>,
}

/// A node plus the set of its children, for constant-time duplicate checks.
#[derive(Debug)]
struct GraphEntry {
    node: PageNode,
    linked: HashSet<Address>,
}

impl GraphEntry {
    fn new(address: Address) -> Self {
        Self {
            node: PageNode::new(address),
            linked: HashSet::new(),
        }
    }
}

impl PageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a childless node. Returns `false` if the address already had one.
    pub fn register(&self, address: &Address) -> bool {
        let mut created = false;
        self.nodes.entry(address.clone()).or_insert_with(|| {
            created = true;
            GraphEntry::new(address.clone())
        });
        created
    }

    /// Appends `child` to the node at `parent`. Returns `false` when the parent
    /// is unknown or already links to `child`.
    pub fn append_child(&self, parent: &Address, child: Address) -> bool {
        match self.nodes.get_mut(parent) {
            Some(mut entry) => {
                if !entry.linked.insert(child.clone()) {
                    return false;
                }
                entry.node.children.push(child);
                true
            }
            None => false,
        }
    }

    pub fn children(&self, address: &Address) -> Option<Vec<Address>> {
        self.nodes.get(address).map(|entry| entry.node.children.clone())
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.nodes.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Copies the graph into an immutable [`Sitemap`] rooted at `root`.
    pub fn snapshot(&self, root: &Address) -> Sitemap {
        Sitemap::from_nodes(
            root.clone(),
            self.nodes.iter().map(|entry| entry.value().node.clone()),
        )
    }
}

/// Read-only page graph handed to renderers once a crawl has finished.
#[derive(Debug, Clone)]
pub struct Sitemap {
    root: Address,
    pages: HashMap<Address, PageNode>,
}

impl Sitemap {
    pub fn from_nodes(root: Address, nodes: impl IntoIterator<Item = PageNode>) -> Self {
        let pages = nodes
            .into_iter()
            .map(|node| (node.address.clone(), node))
            .collect();
        Self { root, pages }
    }

    pub fn root(&self) -> &Address {
        &self.root
    }

    pub fn get(&self, address: &Address) -> Option<&PageNode> {
        self.pages.get(address)
    }

    /// Children of `address`, or an empty slice for pages that were linked to
    /// but never crawled.
    pub fn children(&self, address: &Address) -> &[Address] {
        self.pages
            .get(address)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.pages.contains_key(address)
    }

    pub fn pages(&self) -> impl Iterator<Item = &PageNode> {
        self.pages.values()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn link_count(&self) -> usize {
        self.pages.values().map(|node| node.children.len()).sum()
    }
}
