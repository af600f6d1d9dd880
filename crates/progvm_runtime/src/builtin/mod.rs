//! The builtin registry and the default native set.
//!
//! Images reference builtins as negative function entries whose magnitude
//! is an id into the host's callback table. Ids drift between toolchains,
//! so the registry can remap by name: a builtin stub in the image whose
//! name matches a host native is bound to the image's declared id, whatever
//! id the host would have used. Remapping produces human-readable
//! diagnostics rather than failing the load; an unresolved id only faults
//! if a script actually calls it.

use progvm_foundation::ExecResult;
use progvm_image::BytecodeImage;

use crate::exec::Vm;

mod entity;
mod math;
mod string;

/// Signature of a native builtin. Arguments arrive in the parameter
/// blocks, results leave through the return slots.
pub type BuiltinFn = fn(&mut Vm) -> ExecResult<()>;

/// One host-provided native with its conventional id.
#[derive(Copy, Clone, Debug)]
pub struct BuiltinDef {
    /// Conventional id, used when an image does not name the builtin.
    pub id: u32,
    /// Name matched against the image's builtin stubs.
    pub name: &'static str,
    /// The native callback.
    pub func: BuiltinFn,
}

/// How builtin ids in the image are bound to host natives.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RemapMode {
    /// Bind by stub name where possible, falling back to declared ids.
    #[default]
    ByName,
    /// Trust the image's declared ids as-is.
    DeclaredIds,
}

/// Callback tables never grow past this many ids; images declaring larger
/// ids get a diagnostic and fault at call time.
const MAX_BUILTIN_ID: u32 = 1024;

/// The default native set, with ids from the original toolchain.
pub const DEFAULT_BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        id: 7,
        name: "random",
        func: math::native_random,
    },
    BuiltinDef {
        id: 14,
        name: "spawn",
        func: entity::native_spawn,
    },
    BuiltinDef {
        id: 15,
        name: "remove",
        func: entity::native_remove,
    },
    BuiltinDef {
        id: 25,
        name: "dprint",
        func: string::native_dprint,
    },
    BuiltinDef {
        id: 26,
        name: "ftos",
        func: string::native_ftos,
    },
    BuiltinDef {
        id: 27,
        name: "vtos",
        func: string::native_vtos,
    },
    BuiltinDef {
        id: 36,
        name: "rint",
        func: math::native_rint,
    },
    BuiltinDef {
        id: 37,
        name: "floor",
        func: math::native_floor,
    },
    BuiltinDef {
        id: 38,
        name: "ceil",
        func: math::native_ceil,
    },
    BuiltinDef {
        id: 43,
        name: "fabs",
        func: math::native_fabs,
    },
];

/// Id-indexed table of bound native callbacks.
#[derive(Clone)]
pub struct BuiltinRegistry {
    slots: Vec<Option<BuiltinFn>>,
}

impl BuiltinRegistry {
    /// Binds host natives to the ids an image declares.
    ///
    /// Returns the registry and a list of diagnostics: remaps performed,
    /// duplicate conventional ids, and stubs no native answers to.
    #[must_use]
    pub fn remap(
        image: &BytecodeImage,
        defs: &[BuiltinDef],
        mode: RemapMode,
    ) -> (Self, Vec<String>) {
        let mut diagnostics = Vec::new();

        let top = defs
            .iter()
            .map(|d| d.id)
            .chain(
                image
                    .functions
                    .iter()
                    .filter_map(progvm_image::FunctionDescriptor::builtin_id),
            )
            .filter(|&id| id <= MAX_BUILTIN_ID)
            .max()
            .unwrap_or(0);
        let mut slots: Vec<Option<BuiltinFn>> = vec![None; top as usize + 1];

        for def in defs {
            let at = def.id as usize;
            if slots[at].is_some() {
                diagnostics.push(format!(
                    "duplicate conventional id #{} ('{}' ignored)",
                    def.id, def.name
                ));
                continue;
            }
            slots[at] = Some(def.func);
        }

        if mode == RemapMode::ByName {
            for f in &image.functions {
                let Some(declared) = f.builtin_id() else {
                    continue;
                };
                let name = image.string_or_empty(f.name);
                if declared > MAX_BUILTIN_ID {
                    diagnostics.push(format!("builtin '{name}' declares wild id #{declared}"));
                    continue;
                }
                match defs.iter().find(|d| d.name == name) {
                    Some(def) => {
                        if def.id != declared {
                            slots[declared as usize] = Some(def.func);
                            diagnostics
                                .push(format!("builtin '{name}' remapped #{} -> #{declared}", def.id));
                        }
                    }
                    None => {
                        if slots[declared as usize].is_none() {
                            diagnostics.push(format!("unresolved builtin '{name}' #{declared}"));
                        }
                    }
                }
            }
        }

        (Self { slots }, diagnostics)
    }

    /// Looks up the callback bound to `id`.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<BuiltinFn> {
        self.slots.get(id as usize).copied().flatten()
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = self.slots.iter().filter(|s| s.is_some()).count();
        write!(f, "BuiltinRegistry({bound} of {} ids bound)", self.slots.len())
    }
}
