//! Scene graph: node hierarchy with local and world transforms.
//!
//! Nodes live in a flat arena and reference each other by index. Meshes and
//! lights are attached to nodes by index into the scene's mesh and light
//! tables, so the graph itself stays free of GPU resources.

use std::collections::BTreeMap;

use cgmath::{Matrix4, SquareMatrix};
use log::warn;

use crate::data_structures::{instance::Transform, light::LightDesc};

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: Option<String>,
    pub local: Transform,
    /// Parent world matrix times `local`. Valid after `update_world_transforms`.
    pub world: Matrix4<f32>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Indices into the scene's mesh table (one per glTF primitive).
    pub meshes: Vec<usize>,
    pub light: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<usize>,
    lights: Vec<LightDesc>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or as a root) and return its index.
    pub fn add_node(&mut self, parent: Option<usize>, local: Transform) -> usize {
        let idx = self.nodes.len();
        let parent = match parent {
            Some(p) if p < idx => Some(p),
            Some(p) => {
                warn!("parent {} does not exist, node {} becomes a root", p, idx);
                None
            }
            None => None,
        };
        self.nodes.push(SceneNode {
            name: None,
            local,
            world: local.to_matrix(),
            parent,
            children: Vec::new(),
            meshes: Vec::new(),
            light: None,
        });
        match parent {
            Some(p) => self.nodes[p].children.push(idx),
            None => self.roots.push(idx),
        }
        idx
    }

    pub fn node(&self, idx: usize) -> Option<&SceneNode> {
        self.nodes.get(idx)
    }

    pub fn node_mut(&mut self, idx: usize) -> Option<&mut SceneNode> {
        self.nodes.get_mut(idx)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a light and attach it to `node`.
    pub fn attach_light(&mut self, node: usize, light: LightDesc) -> Option<usize> {
        let slot = self.nodes.get_mut(node)?;
        let idx = self.lights.len();
        slot.light = Some(idx);
        self.lights.push(light);
        Some(idx)
    }

    pub fn lights(&self) -> &[LightDesc] {
        &self.lights
    }

    /// Recompute every world transform from the roots down.
    pub fn update_world_transforms(&mut self) {
        let mut stack: Vec<(usize, Matrix4<f32>)> = self
            .roots
            .iter()
            .rev()
            .map(|&root| (root, Matrix4::identity()))
            .collect();
        while let Some((idx, parent_world)) = stack.pop() {
            let node = &mut self.nodes[idx];
            node.world = parent_world * node.local.to_matrix();
            let world = node.world;
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
        }
    }

    /// World matrices of every mesh reference, grouped by mesh index.
    ///
    /// Grouping keeps each mesh's instances contiguous so a single instanced
    /// draw covers all of them. Order within a group follows graph order.
    pub fn mesh_instances(&self) -> BTreeMap<usize, Vec<Matrix4<f32>>> {
        let mut groups: BTreeMap<usize, Vec<Matrix4<f32>>> = BTreeMap::new();
        for node in &self.nodes {
            for &mesh in &node.meshes {
                groups.entry(mesh).or_default().push(node.world);
            }
        }
        groups
    }

    /// Lights paired with the world matrix of the node that owns them.
    pub fn world_lights(&self) -> Vec<(&LightDesc, Matrix4<f32>)> {
        self.nodes
            .iter()
            .filter_map(|node| {
                let light = self.lights.get(node.light?)?;
                Some((light, node.world))
            })
            .collect()
    }
}
