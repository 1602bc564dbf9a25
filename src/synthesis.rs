//! Insert-or-reuse planning of synthesized members.
//!
//! [`plan`] is a pure function of the host's current members and the
//! members its rewritten calls need. It never touches the tree; the rewriter
//! applies the resulting [`SynthesisPlan`].

use crate::syntax::ast::{describe_field, describe_method};
use crate::syntax::{Member, NodeId, TypeDecl};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Field,
    StaticInitializer,
    Method,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Field => "field",
            Self::StaticInitializer => "static initializer",
            Self::Method => "method",
        })
    }
}

/// The part of a member that decides whether an existing one can stand in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberSignature {
    Field { ty: String, is_static: bool },
    /// Normalized text of the whole initializer.
    Initializer { body: String },
    Method {
        params: Vec<String>,
        returns: String,
        is_static: bool,
    },
}

/// A member some rule needs in the host, with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    /// Empty for initializers.
    pub name: String,
    pub signature: MemberSignature,
    pub source: String,
    /// Fields an initializer must follow.
    pub after: Vec<String>,
    pub rule: String,
}

impl MemberSpec {
    pub fn kind(&self) -> MemberKind {
        match self.signature {
            MemberSignature::Field { .. } => MemberKind::Field,
            MemberSignature::Initializer { .. } => MemberKind::StaticInitializer,
            MemberSignature::Method { .. } => MemberKind::Method,
        }
    }

    pub fn display_name(&self) -> &str {
        match self.kind() {
            MemberKind::StaticInitializer => "static initializer",
            _ => &self.name,
        }
    }

    pub fn describe(&self) -> String {
        match &self.signature {
            MemberSignature::Field { ty, is_static } => describe_field(*is_static, ty, &self.name),
            MemberSignature::Initializer { .. } => "static initializer".to_string(),
            MemberSignature::Method {
                params,
                returns,
                is_static,
            } => describe_method(*is_static, returns, &self.name, params),
        }
    }

    fn same_slot(&self, other: &MemberSpec) -> bool {
        match (&self.signature, &other.signature) {
            (MemberSignature::Initializer { body: a }, MemberSignature::Initializer { body: b }) => {
                a == b
            }
            _ => self.kind() == other.kind() && self.name == other.name,
        }
    }
}

/// A synthesized member would clash with an incompatible one of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot add `{required}` to `{type_name}`: `{member}` is already declared as `{existing}`")]
pub struct NameConflict {
    pub type_name: String,
    pub member: String,
    pub existing: String,
    pub required: String,
}

/// Reasons a host cannot be planned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error(transparent)]
    NameConflict(#[from] NameConflict),

    /// A reused member would only be initialized after class initialization
    /// already called a helper that needs it.
    #[error("cannot rewrite `{type_name}`: `{member}` is declared after `{first_use}`, which calls the helper while the class initializes")]
    DeclaredAfterUse {
        type_name: String,
        member: String,
        first_use: String,
    },
}

/// Merge the members required by several rules. Identical members are kept
/// once; two rules disagreeing about a member of the same name conflict.
pub fn union_specs(
    type_name: &str,
    specs: impl IntoIterator<Item = MemberSpec>,
) -> Result<Vec<MemberSpec>, NameConflict> {
    let mut merged: Vec<MemberSpec> = Vec::new();
    for spec in specs {
        match merged.iter().find(|m| m.same_slot(&spec)) {
            Some(existing) if existing.signature == spec.signature => {}
            Some(existing) => {
                return Err(NameConflict {
                    type_name: type_name.to_string(),
                    member: spec.name.clone(),
                    existing: format!("{} (rule `{}`)", existing.describe(), existing.rule),
                    required: format!("{} (rule `{}`)", spec.describe(), spec.rule),
                })
            }
            None => merged.push(spec),
        }
    }
    Ok(merged)
}

/// Where a new member goes in the host body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Start of the body, in plan order.
    Top,
    /// Directly after an existing member.
    After(NodeId),
    /// End of the body, in plan order.
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMember {
    pub spec: MemberSpec,
    pub placement: Placement,
}

#[derive(Debug, Clone)]
pub struct SynthesisPlan {
    pub host: NodeId,
    pub host_name: String,
    /// Members to insert, in insertion order.
    pub additions: Vec<PlannedMember>,
    /// Required members the host already declares.
    pub reused: Vec<MemberSpec>,
}

impl SynthesisPlan {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
    }
}

enum Existing {
    Compatible(NodeId),
    Absent,
    Conflict(String),
}

fn find_existing(members: &[Member], spec: &MemberSpec) -> Existing {
    match &spec.signature {
        MemberSignature::Field { ty, is_static } => {
            let found = members.iter().find_map(|m| match m {
                Member::Field(field) if field.names().contains(&spec.name) => {
                    Some((m.node().id(), field))
                }
                _ => None,
            });
            match found {
                None => Existing::Absent,
                Some((id, field))
                    if field.declared_type() == *ty && field.is_static() == *is_static =>
                {
                    Existing::Compatible(id)
                }
                Some((_, field)) => Existing::Conflict(field.describe()),
            }
        }
        MemberSignature::Initializer { body } => members
            .iter()
            .find_map(|m| match m {
                Member::StaticInitializer(init) if init.normalized_text() == *body => {
                    Some(Existing::Compatible(m.node().id()))
                }
                _ => None,
            })
            .unwrap_or(Existing::Absent),
        MemberSignature::Method {
            params,
            returns,
            is_static,
        } => {
            let same_name: Vec<_> = members
                .iter()
                .filter_map(|m| match m {
                    Member::Method(method) if method.name() == spec.name => Some((m, method)),
                    _ => None,
                })
                .collect();
            let compatible = same_name.iter().find(|(_, method)| {
                method.parameter_types() == *params
                    && method.return_type() == *returns
                    && method.is_static() == *is_static
            });
            match (compatible, same_name.first()) {
                (Some((member, _)), _) => Existing::Compatible(member.node().id()),
                (None, Some((_, method))) => Existing::Conflict(method.describe()),
                (None, None) => Existing::Absent,
            }
        }
    }
}

/// The first member that runs a rewritten call while the class initializes:
/// a static field initializer or a static block containing one of `calls`.
fn first_static_use(members: &[Member], calls: &[NodeId]) -> Option<usize> {
    members.iter().position(|m| {
        let runs_at_init = match m {
            Member::Field(field) => field.is_static(),
            Member::StaticInitializer(_) => true,
            _ => false,
        };
        runs_at_init && calls.iter().any(|id| m.node().find(*id).is_some())
    })
}

fn describe_member(member: &Member) -> String {
    match member {
        Member::Field(field) => field.describe(),
        Member::Method(method) => method.describe(),
        Member::StaticInitializer(_) => "static initializer".to_string(),
        Member::Other(node) => node.kind().to_string(),
    }
}

/// Decide, for each required member, whether the host already has it.
///
/// `calls` are the call sites that will be rewritten in this host. When one
/// of them runs during class initialization, the generator and its seeding
/// block must come before it.
///
/// Fails on the first member whose name is taken by an incompatible
/// declaration; the host must then be left untouched.
pub fn plan(
    host: &TypeDecl,
    required: &[MemberSpec],
    calls: &[NodeId],
) -> Result<SynthesisPlan, PlanError> {
    let host_name = host.name();
    let members = host.members();
    let mut additions = Vec::new();
    let mut reused = Vec::new();
    let mut reused_fields: Vec<(String, usize)> = Vec::new();
    let first_use = first_static_use(&members, calls);
    let position = |id: NodeId| members.iter().position(|m| m.node().id() == id);

    for spec in required {
        match find_existing(&members, spec) {
            Existing::Compatible(id) => {
                let at = position(id);
                let feeds_helpers = match spec.kind() {
                    MemberKind::Field => required.iter().any(|r| r.after.contains(&spec.name)),
                    MemberKind::StaticInitializer => true,
                    MemberKind::Method => false,
                };
                if let (Some(at), Some(use_at)) = (at, first_use) {
                    if feeds_helpers && at > use_at {
                        return Err(PlanError::DeclaredAfterUse {
                            type_name: host_name,
                            member: spec.display_name().to_string(),
                            first_use: describe_member(&members[use_at]),
                        });
                    }
                }
                if let (MemberKind::Field, Some(at)) = (spec.kind(), at) {
                    reused_fields.push((spec.name.clone(), at));
                }
                reused.push(spec.clone());
            }
            Existing::Conflict(existing) => {
                return Err(NameConflict {
                    type_name: host_name,
                    member: spec.name.clone(),
                    existing,
                    required: spec.describe(),
                }
                .into());
            }
            Existing::Absent => additions.push(spec.clone()),
        }
    }

    // Fields declared before any other member; a new initializer joins them
    // unless one of them already calls a helper.
    let leading_fields = members
        .iter()
        .take_while(|m| matches!(m, Member::Field(_)))
        .count();
    let leading_anchor = leading_fields
        .checked_sub(1)
        .filter(|last| first_use.map_or(true, |use_at| *last < use_at));
    let additions = additions
        .into_iter()
        .map(|spec| {
            let placement = match spec.kind() {
                MemberKind::Field => Placement::Top,
                MemberKind::Method => Placement::End,
                MemberKind::StaticInitializer => reused_fields
                    .iter()
                    .filter(|(name, _)| spec.after.contains(name))
                    .map(|(_, at)| *at)
                    .chain(leading_anchor)
                    .max()
                    .and_then(|index| members.get(index))
                    .map(|m| Placement::After(m.node().id()))
                    .unwrap_or(Placement::Top),
            };
            PlannedMember { spec, placement }
        })
        .collect();

    Ok(SynthesisPlan {
        host: host.id(),
        host_name,
        additions,
        reused,
    })
}
