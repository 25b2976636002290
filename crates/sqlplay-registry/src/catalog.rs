use once_cell::sync::Lazy;
use sqlplay_types::{Dialect, FileName, PlaygroundFileTree, PresetManifest};
use std::collections::BTreeMap;

pub(crate) const TOOLS: &str = include_str!("../templates/tools.play");

type Files = &'static [(FileName, &'static str)];

#[derive(Debug)]
pub(crate) struct PresetTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub files: Files,
}

impl PresetTemplate {
    pub fn manifest(&self) -> PresetManifest {
        PresetManifest {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct DialectTemplates {
    pub core: Files,
    pub presets: &'static [PresetTemplate],
}

impl DialectTemplates {
    pub fn preset(&self, id: &str) -> Option<&PresetTemplate> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Core defaults plus the toolkit reference.
    pub fn core_tree(&self) -> PlaygroundFileTree {
        let tree = tree_from(self.core);
        tree.with(FileName::Tools, TOOLS)
    }
}

fn tree_from(files: Files) -> PlaygroundFileTree {
    let mut tree = PlaygroundFileTree::default();
    for (name, source) in files {
        tree.set(*name, *source);
    }
    tree
}

pub(crate) fn preset_tree(preset: &PresetTemplate) -> PlaygroundFileTree {
    tree_from(preset.files)
}

const SQLITE_CORE: Files = &[
    (FileName::Schema, include_str!("../templates/sqlite/core/schema.play")),
    (FileName::Index, include_str!("../templates/sqlite/core/index.play")),
];

const SQLITE_PRESETS: &[PresetTemplate] = &[
    PresetTemplate {
        id: "todo",
        name: "Todo lists",
        description: "Lists and todos with a cascading foreign key and a composite index",
        files: &[
            (FileName::Schema, include_str!("../templates/sqlite/presets/todo/schema.play")),
            (FileName::Seed, include_str!("../templates/sqlite/presets/todo/seed.play")),
            (FileName::Index, include_str!("../templates/sqlite/presets/todo/index.play")),
        ],
    },
    PresetTemplate {
        id: "blog",
        name: "Blog",
        description: "Authors, posts and comments seeded from shared utilities",
        files: &[
            (FileName::Schema, include_str!("../templates/sqlite/presets/blog/schema.play")),
            (FileName::Utils, include_str!("../templates/sqlite/presets/blog/utils.play")),
            (FileName::Seed, include_str!("../templates/sqlite/presets/blog/seed.play")),
            (FileName::Index, include_str!("../templates/sqlite/presets/blog/index.play")),
        ],
    },
];

const POSTGRESQL_CORE: Files = &[
    (FileName::Schema, include_str!("../templates/postgresql/core/schema.play")),
    (FileName::Index, include_str!("../templates/postgresql/core/index.play")),
];

const POSTGRESQL_PRESETS: &[PresetTemplate] = &[
    PresetTemplate {
        id: "blog",
        name: "Blog",
        description: "UUID keys, JSON tags and an author shared through utils",
        files: &[
            (FileName::Schema, include_str!("../templates/postgresql/presets/blog/schema.play")),
            (FileName::Utils, include_str!("../templates/postgresql/presets/blog/utils.play")),
            (FileName::Seed, include_str!("../templates/postgresql/presets/blog/seed.play")),
            (FileName::Index, include_str!("../templates/postgresql/presets/blog/index.play")),
        ],
    },
    PresetTemplate {
        id: "policies",
        name: "Row-level policies",
        description: "Role-based write denial exercised with `with identity` blocks",
        files: &[
            (FileName::Schema, include_str!("../templates/postgresql/presets/policies/schema.play")),
            (FileName::Seed, include_str!("../templates/postgresql/presets/policies/seed.play")),
            (FileName::Index, include_str!("../templates/postgresql/presets/policies/index.play")),
        ],
    },
];

pub(crate) static CATALOG: Lazy<BTreeMap<Dialect, DialectTemplates>> = Lazy::new(|| {
    let mut catalog = BTreeMap::new();
    catalog.insert(
        Dialect::Sqlite,
        DialectTemplates {
            core: SQLITE_CORE,
            presets: SQLITE_PRESETS,
        },
    );
    catalog.insert(
        Dialect::Postgresql,
        DialectTemplates {
            core: POSTGRESQL_CORE,
            presets: POSTGRESQL_PRESETS,
        },
    );
    catalog
});
