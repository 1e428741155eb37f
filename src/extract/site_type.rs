//! Site classification and per-type extraction strategies

use crate::url::matches_domain;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use super::selector;

/// Extraction strategy tag recorded on every document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteType {
    #[default]
    Generic,
    Documentation,
    Wiki,
    CodeForge,
    RawMarkdown,
    ManPage,
}

impl SiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Generic => "generic",
            SiteType::Documentation => "documentation",
            SiteType::Wiki => "wiki",
            SiteType::CodeForge => "code_forge",
            SiteType::RawMarkdown => "raw_markdown",
            SiteType::ManPage => "man_page",
        }
    }

    /// The extraction strategy registered for this type
    pub fn strategy(&self) -> &'static Strategy {
        match self {
            SiteType::Generic => &GENERIC,
            SiteType::Documentation => &DOCUMENTATION,
            SiteType::Wiki => &WIKI,
            SiteType::CodeForge => &CODE_FORGE,
            SiteType::RawMarkdown => &RAW_MARKDOWN,
            SiteType::ManPage => &MAN_PAGE,
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to find the content container for one site type
#[derive(Debug)]
pub struct Strategy {
    /// Candidate containers, highest priority first
    pub selectors: &'static [&'static str],

    /// Type-specific widgets stripped before candidates are measured
    pub cleanup: &'static [&'static str],

    /// Use the whole body text instead of looking for a container
    pub verbatim: bool,
}

const GENERIC: Strategy = Strategy {
    selectors: &[
        "article",
        "main",
        "[role='main']",
        "#content",
        ".content",
        ".post-content",
        ".entry-content",
        ".article-body",
        "#main",
    ],
    cleanup: &[
        ".related",
        ".related-articles",
        ".related-posts",
        ".share",
        ".comments",
        "#comments",
        ".newsletter",
        ".author-bio",
    ],
    verbatim: false,
};

const DOCUMENTATION: Strategy = Strategy {
    selectors: &[
        "[role='main']",
        ".rst-content",
        ".md-content",
        ".theme-doc-markdown",
        ".document",
        "#main-content",
        "main",
        "article",
        ".content",
    ],
    cleanup: &[
        ".toc",
        "#toc",
        ".table-of-contents",
        ".headerlink",
        ".sidebar",
        ".sphinxsidebar",
        ".breadcrumbs",
        ".edit-this-page",
        ".pagination-nav",
        ".md-source-file",
    ],
    verbatim: false,
};

const WIKI: Strategy = Strategy {
    selectors: &[
        ".mw-parser-output",
        "#mw-content-text",
        "#bodyContent",
        "main",
        "article",
    ],
    cleanup: &[
        ".infobox",
        ".navbox",
        ".toc",
        "#toc",
        ".mw-editsection",
        ".reference",
        ".reflist",
        ".hatnote",
        ".metadata",
        ".sistersitebox",
        ".mw-jump-link",
        ".catlinks",
    ],
    verbatim: false,
};

const CODE_FORGE: Strategy = Strategy {
    selectors: &[
        "article.markdown-body",
        ".markdown-body",
        "#readme",
        ".readme",
        ".file-content",
        "main",
    ],
    cleanup: &[
        ".anchor",
        ".octicon",
        "clipboard-copy",
        ".file-navigation",
        ".file-header",
    ],
    verbatim: false,
};

const RAW_MARKDOWN: Strategy = Strategy {
    selectors: &[],
    cleanup: &[],
    verbatim: true,
};

const MAN_PAGE: Strategy = Strategy {
    selectors: &[".manual-text", "#content", "#manpage", "main", "pre"],
    cleanup: &[".top-link", "#navbar", ".head", ".foot", ".nav"],
    verbatim: false,
};

/// Hostname table, checked before any page hints
const HOST_TABLE: &[(&str, SiteType)] = &[
    ("raw.githubusercontent.com", SiteType::RawMarkdown),
    ("gist.githubusercontent.com", SiteType::RawMarkdown),
    ("github.com", SiteType::CodeForge),
    ("gitlab.com", SiteType::CodeForge),
    ("codeberg.org", SiteType::CodeForge),
    ("bitbucket.org", SiteType::CodeForge),
    ("sr.ht", SiteType::CodeForge),
    ("docs.rs", SiteType::Documentation),
    ("doc.rust-lang.org", SiteType::Documentation),
    ("docs.python.org", SiteType::Documentation),
    ("developer.mozilla.org", SiteType::Documentation),
    ("readthedocs.io", SiteType::Documentation),
    ("readthedocs.org", SiteType::Documentation),
    ("wikipedia.org", SiteType::Wiki),
    ("wikibooks.org", SiteType::Wiki),
    ("wiktionary.org", SiteType::Wiki),
    ("wiki.archlinux.org", SiteType::Wiki),
    ("fandom.com", SiteType::Wiki),
    ("man7.org", SiteType::ManPage),
    ("manpages.debian.org", SiteType::ManPage),
    ("manpages.ubuntu.com", SiteType::ManPage),
    ("man.archlinux.org", SiteType::ManPage),
    ("man.openbsd.org", SiteType::ManPage),
    ("man.freebsd.org", SiteType::ManPage),
    ("linux.die.net", SiteType::ManPage),
];

/// Picks the extraction strategy for a page
///
/// Known hosts win, then host prefixes such as `docs.` and `wiki.`, then a
/// `<meta name="generator">` hint. Everything else is [`SiteType::Generic`].
pub fn detect_type(document: &Html, url: &Url) -> SiteType {
    let host = url.host_str().unwrap_or_default().to_lowercase();

    if let Some((_, site_type)) = HOST_TABLE
        .iter()
        .find(|(domain, _)| matches_domain(domain, &host))
    {
        return *site_type;
    }

    if host.starts_with("docs.") || host.starts_with("doc.") {
        return SiteType::Documentation;
    }
    if host.starts_with("wiki.") {
        return SiteType::Wiki;
    }

    generator_hint(document).unwrap_or_default()
}

fn generator_hint(document: &Html) -> Option<SiteType> {
    let meta = selector("meta[name='generator'][content]")?;
    let generator = document
        .select(&meta)
        .filter_map(|el| el.value().attr("content"))
        .next()?
        .to_lowercase();

    if generator.contains("mediawiki") {
        Some(SiteType::Wiki)
    } else if ["sphinx", "mkdocs", "docusaurus", "gitbook", "vitepress"]
        .iter()
        .any(|g| generator.contains(g))
    {
        Some(SiteType::Documentation)
    } else {
        None
    }
}
