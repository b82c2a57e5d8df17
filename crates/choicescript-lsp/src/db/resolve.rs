//! Symbol resolution across a project.

use choicescript_parser::{Occurrence, OccurrenceKind, Span};

use super::{IndexEntry, ProjectSnapshot};

/// What an occurrence refers to. Keys are lowercase except scene names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    /// A variable.
    Variable(String),
    /// A label of a scene.
    Label {
        /// Scene declaring the label.
        scene: String,
        /// Label key.
        key: String,
    },
    /// A whole scene.
    Scene(String),
    /// An achievement.
    Achievement(String),
}

impl SymbolRef {
    /// The symbol an occurrence in `scene` refers to. Text runs refer to nothing.
    pub fn of(occ: &Occurrence, scene: &str) -> Option<Self> {
        let symbol = match occ.kind {
            OccurrenceKind::GlobalVariable
            | OccurrenceKind::LocalVariable
            | OccurrenceKind::VariableRead
            | OccurrenceKind::VariableWrite => Self::Variable(occ.key()),
            OccurrenceKind::Label | OccurrenceKind::LabelReference => Self::Label {
                scene: scene.to_string(),
                key: occ.key(),
            },
            OccurrenceKind::SceneLabelReference => Self::Label {
                scene: occ.scene.clone()?,
                key: occ.key(),
            },
            OccurrenceKind::SceneReference => Self::Scene(occ.name.clone()),
            OccurrenceKind::Achievement | OccurrenceKind::AchievementReference => {
                Self::Achievement(occ.key())
            }
            OccurrenceKind::Text => return None,
        };
        Some(symbol)
    }

    /// Whether two symbols could be the same, before scoping is considered.
    fn same_name(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Variable(a), Self::Variable(b))
            | (Self::Scene(a), Self::Scene(b))
            | (Self::Achievement(a), Self::Achievement(b)) => a == b,
            (Self::Label { key: a, .. }, Self::Label { key: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// Where a symbol is declared.
#[derive(Debug, Clone, Copy)]
pub struct Declaration<'a> {
    /// The declaring document.
    pub entry: &'a IndexEntry,
    /// The declaring occurrence, or `None` when the symbol is the document itself.
    pub occurrence: Option<&'a Occurrence>,
}

impl Declaration<'_> {
    /// Span of the declaration; the start of the document for a scene.
    pub fn span(&self) -> Span {
        self.occurrence.map_or(Span::new(0, 0), |occ| occ.span)
    }

    /// Whether two declarations are the same site.
    pub fn same_site(&self, other: &Declaration<'_>) -> bool {
        self.entry.uri == other.entry.uri
            && self.occurrence.map(|occ| occ.span) == other.occurrence.map(|occ| occ.span)
    }
}

impl ProjectSnapshot {
    /// Resolve a symbol seen from `from` to its declaration.
    ///
    /// Variables resolve to the scene's own `*temp` first, then its
    /// `*create`, then the project's globals in startup.
    pub fn resolve<'a>(
        &'a self,
        from: &'a IndexEntry,
        symbol: &SymbolRef,
    ) -> Option<Declaration<'a>> {
        match symbol {
            SymbolRef::Variable(key) => from
                .scene
                .find_variable(key)
                .map(|occ| Declaration {
                    entry: from,
                    occurrence: Some(occ),
                })
                .or_else(|| {
                    let startup = self.startup()?;
                    let occ = startup.exports.globals.get(key)?;
                    Some(Declaration {
                        entry: startup,
                        occurrence: Some(occ),
                    })
                }),
            SymbolRef::Label { scene, key } => {
                let target = if *scene == from.scene_name {
                    from
                } else {
                    self.scene(scene)?
                };
                let occ = target.exports.labels.get(key)?;
                Some(Declaration {
                    entry: target,
                    occurrence: Some(occ),
                })
            }
            SymbolRef::Scene(name) => {
                let target = if *name == from.scene_name {
                    from
                } else {
                    self.scene(name)?
                };
                Some(Declaration {
                    entry: target,
                    occurrence: None,
                })
            }
            SymbolRef::Achievement(key) => from
                .exports
                .achievements
                .get(key)
                .map(|occ| Declaration {
                    entry: from,
                    occurrence: Some(occ),
                })
                .or_else(|| {
                    let startup = self.startup()?;
                    let occ = startup.exports.achievements.get(key)?;
                    Some(Declaration {
                        entry: startup,
                        occurrence: Some(occ),
                    })
                }),
        }
    }

    /// Every occurrence in the project that refers to the same declaration as
    /// `symbol` seen from `from`, in URI then source order.
    ///
    /// A symbol that does not resolve matches occurrences with the same
    /// unresolved name.
    pub fn references<'a>(
        &'a self,
        from: &'a IndexEntry,
        symbol: &SymbolRef,
    ) -> Vec<(&'a IndexEntry, &'a Occurrence)> {
        let target = self.resolve(from, symbol);
        let mut found = Vec::new();

        for entry in self.entries() {
            for occ in &entry.scene.occurrences {
                let Some(candidate) = SymbolRef::of(occ, &entry.scene_name) else {
                    continue;
                };
                if !candidate.same_name(symbol) {
                    continue;
                }
                let matches = match (&target, self.resolve(entry, &candidate)) {
                    (Some(target), Some(decl)) => target.same_site(&decl),
                    (None, None) => candidate == *symbol,
                    _ => false,
                };
                if matches {
                    found.push((entry, occ));
                }
            }
        }

        found
    }
}
