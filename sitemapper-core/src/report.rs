// Sitemap rendering from a finished crawl

use serde::Serialize;
use sitemapper_scanner::{Address, CrawlStats, Sitemap};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SitemapFormat {
    Text,
    Json,
}

impl SitemapFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "tree" => Some(SitemapFormat::Text),
            "json" => Some(SitemapFormat::Json),
            _ => None,
        }
    }
}

/// Depth-first spanning tree of a sitemap.
///
/// Every page reachable from the root appears exactly once, under the parent
/// from which the traversal first reached it. Siblings keep the order in which
/// the links were discovered.
#[derive(Debug)]
pub struct SitemapTree<'a> {
    root: &'a Address,
    children: HashMap<&'a Address, Vec<&'a Address>>,
    order: Vec<(&'a Address, usize)>,
}

impl<'a> SitemapTree<'a> {
    pub fn build(sitemap: &'a Sitemap) -> Self {
        let root = sitemap.root();
        let mut visited: HashSet<&Address> = HashSet::new();
        let mut children: HashMap<&Address, Vec<&Address>> = HashMap::new();
        let mut order = Vec::new();

        // Explicit stack; children are pushed in reverse so they pop in
        // insertion order. Visited is checked on pop, which matches a
        // recursive first-visit traversal.
        let mut stack: Vec<(&Address, Option<&Address>, usize)> = vec![(root, None, 0)];
        while let Some((node, parent, depth)) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push((node, depth));
            if let Some(parent) = parent {
                children.entry(parent).or_default().push(node);
            }
            for child in sitemap.children(node).iter().rev() {
                if !visited.contains(child) {
                    stack.push((child, Some(node), depth + 1));
                }
            }
        }

        Self {
            root,
            children,
            order,
        }
    }

    pub fn root(&self) -> &'a Address {
        self.root
    }

    pub fn children(&self, address: &Address) -> &[&'a Address] {
        self.children
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pages with their tree depth, in traversal order.
    pub fn preorder(&self) -> &[(&'a Address, usize)] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub fn render_sitemap(
    sitemap: &Sitemap,
    format: SitemapFormat,
) -> Result<String, serde_json::Error> {
    match format {
        SitemapFormat::Text => Ok(generate_text_sitemap(sitemap)),
        SitemapFormat::Json => generate_json_sitemap(sitemap),
    }
}

/// Renders the sitemap as an indented tree:
///
/// ```text
/// https://example.com/
/// ├── https://example.com/a
/// │   └── https://example.com/a/b
/// └── https://example.com/c
/// ```
///
/// A root that was never crawled (negative depth, early cancellation) is
/// printed with a `(not crawled)` marker.
pub fn generate_text_sitemap(sitemap: &Sitemap) -> String {
    let tree = SitemapTree::build(sitemap);
    let mut output = String::new();

    output.push_str(tree.root().as_str());
    if !sitemap.contains(tree.root()) {
        output.push_str(" (not crawled)");
    }
    output.push('\n');

    let mut stack: Vec<(&Address, String, bool)> = Vec::new();
    push_children(&mut stack, tree.children(tree.root()), "");

    while let Some((node, prefix, is_last)) = stack.pop() {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&prefix);
        output.push_str(connector);
        output.push_str(node.as_str());
        output.push('\n');

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        push_children(&mut stack, tree.children(node), &child_prefix);
    }

    output
}

fn push_children<'a>(
    stack: &mut Vec<(&'a Address, String, bool)>,
    children: &[&'a Address],
    prefix: &str,
) {
    let last = children.len().saturating_sub(1);
    for (i, child) in children.iter().enumerate().rev() {
        stack.push((*child, prefix.to_string(), i == last));
    }
}

#[derive(Serialize)]
struct JsonSitemap<'a> {
    root: &'a str,
    /// Pages actually crawled; uncrawled leaves are listed but not counted.
    total_pages: usize,
    pages: Vec<JsonPage<'a>>,
}

#[derive(Serialize)]
struct JsonPage<'a> {
    url: &'a str,
    depth: usize,
    crawled: bool,
    links: Vec<&'a str>,
}

/// Flat JSON form: pages in traversal order, each with its full outbound
/// link list (including links to pages shown elsewhere in the tree).
pub fn generate_json_sitemap(sitemap: &Sitemap) -> Result<String, serde_json::Error> {
    let tree = SitemapTree::build(sitemap);

    let pages = tree
        .preorder()
        .iter()
        .map(|(address, depth)| JsonPage {
            url: address.as_str(),
            depth: *depth,
            crawled: sitemap.contains(address),
            links: sitemap.children(address).iter().map(Address::as_str).collect(),
        })
        .collect::<Vec<_>>();

    let json = JsonSitemap {
        root: sitemap.root().as_str(),
        total_pages: sitemap.len(),
        pages,
    };

    serde_json::to_string_pretty(&json)
}

/// Generate a short crawl summary for the terminal
pub fn generate_crawl_summary(stats: &CrawlStats, cancelled: bool) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Pages crawled: {}\n", stats.pages_crawled));
    report.push_str(&format!("  Links found: {}\n", stats.links_found));
    report.push_str(&format!("  Fetch errors: {}\n", stats.fetch_errors));
    if stats.truncated_pages > 0 {
        report.push_str(&format!(
            "  Pages with unresolvable links: {}\n",
            stats.truncated_pages
        ));
    }
    report.push_str(&format!(
        "  Tasks: {} dequeued, {} beyond max depth, {} already visited\n",
        stats.work.spawned, stats.skipped_depth, stats.skipped_visited
    ));
    if cancelled {
        report.push_str("  Status: cancelled (partial sitemap)\n");
    }
    report.push_str(&format!("  Crawling took {:.2?}\n", stats.elapsed));
    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
