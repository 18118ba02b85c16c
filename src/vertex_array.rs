//! Per-submesh cache of vertex bindings, one entry per shader program.
//!
//! A [`VertexArray`] links a program's declared vertex inputs to the
//! attributes of a submesh's [`VertexLayout`] and carries the state built
//! for that pairing (a `wgpu::RenderPipeline` at runtime). Entries are
//! created on first use and never removed; repeated lookups for the same
//! program return the same shared entry.

use std::rc::Rc;

use crate::mesh::VertexLayout;
use crate::program::{ProgramId, ProgramInput};

/// The vertex buffer layout a program reads from one submesh.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexBinding {
    pub stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexBinding {
    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// A (submesh, program) pairing and the state built for it.
#[derive(Debug)]
pub struct VertexArray<P> {
    pub program: ProgramId,
    pub binding: VertexBinding,
    pub state: P,
}

/// Append-only list of vertex arrays owned by one submesh.
#[derive(Debug)]
pub struct VertexArrayCache<P> {
    entries: Vec<Rc<VertexArray<P>>>,
}

impl<P> Default for VertexArrayCache<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P> VertexArrayCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, program: ProgramId) -> Option<Rc<VertexArray<P>>> {
        self.entries
            .iter()
            .find(|entry| entry.program == program)
            .cloned()
    }

    /// Returns the entry for `program`, linking and building it on first use.
    ///
    /// # Panics
    ///
    /// Panics if a program input has no attribute at its location in `layout`.
    pub fn find_or_create(
        &mut self,
        program: ProgramId,
        inputs: &[ProgramInput],
        layout: &VertexLayout,
        build: impl FnOnce(&VertexBinding) -> P,
    ) -> Rc<VertexArray<P>> {
        if let Some(entry) = self.find(program) {
            return entry;
        }

        let binding = link_attributes(inputs, layout);
        let state = build(&binding);
        let entry = Rc::new(VertexArray {
            program,
            binding,
            state,
        });
        log::debug!(
            "Linked vertex array #{} for program {:?} ({} attributes)",
            self.entries.len(),
            program,
            entry.binding.attributes.len()
        );
        self.entries.push(Rc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Matches every program input to the submesh attribute at the same location.
///
/// # Panics
///
/// Panics when an input has no matching attribute; such a program can never
/// draw this submesh.
pub fn link_attributes(inputs: &[ProgramInput], layout: &VertexLayout) -> VertexBinding {
    let attributes = inputs
        .iter()
        .map(|input| {
            let attribute = layout
                .attributes
                .iter()
                .find(|a| a.location == input.location)
                .unwrap_or_else(|| {
                    panic!(
                        "vertex input '{}' (location {}) has no matching submesh attribute",
                        input.name, input.location
                    )
                });
            wgpu::VertexAttribute {
                format: float_format(attribute.components),
                offset: attribute.offset,
                shader_location: input.location,
            }
        })
        .collect();

    VertexBinding {
        stride: layout.stride,
        attributes,
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        4 => wgpu::VertexFormat::Float32x4,
        n => panic!("unsupported vertex attribute width: {n} components"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Vertex, VertexAttribute};

    const POSITION_ONLY: &[ProgramInput] = &[ProgramInput::new("position", 0)];
    const LIT: &[ProgramInput] = &[
        ProgramInput::new("position", 0),
        ProgramInput::new("normal", 1),
        ProgramInput::new("uv", 2),
    ];

    #[test]
    fn repeated_lookup_returns_the_same_entry() {
        let layout = Vertex::layout();
        let mut cache = VertexArrayCache::new();
        let program = ProgramId::next();
        let mut builds = 0;

        let first = cache.find_or_create(program, LIT, &layout, |_| {
            builds += 1;
        });
        let second = cache.find_or_create(program, LIT, &layout, |_| {
            builds += 1;
        });

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(builds, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn each_program_gets_its_own_entry() {
        let layout = Vertex::layout();
        let mut cache = VertexArrayCache::new();
        let geometry = ProgramId::next();
        let forward = ProgramId::next();

        let a = cache.find_or_create(geometry, LIT, &layout, |b| b.attributes.len());
        let b = cache.find_or_create(forward, POSITION_ONLY, &layout, |b| b.attributes.len());

        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!((a.state, b.state), (3, 1));
        assert_eq!(cache.len(), 2);
        assert!(cache.find(geometry).is_some_and(|e| Rc::ptr_eq(&e, &a)));
    }

    #[test]
    fn linked_attributes_take_offsets_from_the_layout() {
        let binding = link_attributes(LIT, &Vertex::layout());
        assert_eq!(binding.stride, std::mem::size_of::<Vertex>() as u64);
        assert_eq!(binding.attributes[1].offset, 12);
        assert_eq!(binding.attributes[2].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(binding.attributes[2].offset, 24);
    }

    #[test]
    #[should_panic(expected = "has no matching submesh attribute")]
    fn missing_attribute_is_fatal() {
        let layout = VertexLayout {
            stride: 12,
            attributes: vec![VertexAttribute {
                location: 0,
                components: 3,
                offset: 0,
            }],
        };
        link_attributes(LIT, &layout);
    }
}
