//! Shader node trees: materials, BRDFs, textures and UVW generators.
//!
//! A node tree is exported dependencies-first, so every plugin a node links
//! to is already declared when the node itself is written. Broken links and
//! cycles are per-entity issues: the slot falls back to a default plugin.

pub mod graph;

pub use graph::{Edge, EntityGraph};

use crate::bus::ExportBus;
use crate::error::{ExportError, Result};
use crate::scene::{NodeLink, Param, ShaderNode};
use crate::types::{plugin_name, AttrValue, PluginDesc, PluginKind, PluginRef};
use std::collections::BTreeMap;

/// Plugin name of a shader node.
pub fn node_plugin_name(node: &ShaderNode) -> String {
    plugin_name(node.kind.name_prefix(), &node.name, node.library.as_deref())
}

/// Value of an unlinked parameter. Links yield `None`.
pub fn param_value(param: &Param) -> Option<AttrValue> {
    match param {
        Param::Bool(b) => Some(AttrValue::Bool(*b)),
        Param::Int(i) => Some(AttrValue::Int(*i)),
        Param::Float(f) => Some(AttrValue::Float(*f as f32)),
        Param::Color(c) => Some(AttrValue::Color(*c)),
        Param::Text(s) => Some(AttrValue::String(s.clone())),
        Param::Link(_) => None,
    }
}

fn link_ref(plugin: String, link: &NodeLink) -> PluginRef {
    match &link.output {
        Some(output) => PluginRef::new(plugin).with_output(output.clone()),
        None => PluginRef::new(plugin),
    }
}

/// Export the tree rooted at `root` and return the root plugin name.
///
/// A missing root or a cycle yields `fallback`.
pub fn export_node_tree(bus: &mut ExportBus<'_>, root: &str, fallback: &str) -> Result<String> {
    Ok(export_tree(bus, root, fallback)?.0)
}

/// Export a material by node name, wrapping a bare BRDF into `MtlSingleBRDF`.
pub fn export_material(bus: &mut ExportBus<'_>, material: Option<&str>) -> Result<String> {
    let fallback = bus.defaults.material.clone();
    let Some(material) = material else {
        return Ok(fallback);
    };

    let (name, kind) = export_tree(bus, material, &fallback)?;
    if kind != Some(PluginKind::Brdf) {
        return Ok(name);
    }

    let wrapper = PluginDesc::new(
        "MtlSingleBRDF",
        format!("MA{}", name),
        PluginKind::Material,
    )
    .with("brdf", PluginRef::new(name));
    bus.write_plugin(&wrapper)
}

/// Copy a parameter table into `desc`, exporting linked node trees.
///
/// Used by entities that are not nodes themselves (lights, volumes, channels).
pub fn export_params(
    bus: &mut ExportBus<'_>,
    params: &BTreeMap<String, Param>,
    desc: &mut PluginDesc,
) -> Result<()> {
    for (key, param) in params {
        let value = match param {
            Param::Link(link) => {
                let fallback = bus.defaults.for_socket(key).to_string();
                bus.context.push(desc.name.clone());
                let exported = export_node_tree(bus, &link.link, &fallback);
                bus.context.pop();
                AttrValue::Ref(link_ref(exported?, link))
            }
            other => match param_value(other) {
                Some(value) => value,
                None => continue,
            },
        };
        desc.set(key, value);
    }
    Ok(())
}

fn export_tree(
    bus: &mut ExportBus<'_>,
    root: &str,
    fallback: &str,
) -> Result<(String, Option<PluginKind>)> {
    // Already written in this frame pass, with its whole subtree.
    if let Some(node) = bus.scene.shader_node(root) {
        let name = node_plugin_name(&node);
        if bus.cache.plugins.contains(&name) {
            return Ok((name, Some(node.kind)));
        }
    }

    let graph = {
        let scene = &*bus.scene;
        EntityGraph::build(root, |name| scene.shader_node(name))
    };
    let Some(graph) = graph else {
        let from = bus.context.current().unwrap_or(root).to_string();
        let err = ExportError::UnresolvedReference {
            from,
            to: root.to_string(),
        };
        let name = bus.report_issue(root, &err, fallback);
        return Ok((name, None));
    };

    let order = match graph.post_order(graph.root()) {
        Ok(order) => order,
        Err(err @ ExportError::CyclicReference(_)) => {
            let name = bus.report_issue(root, &err, fallback);
            return Ok((name, None));
        }
        Err(err) => return Err(err),
    };

    for index in order {
        let desc = node_desc(bus, &graph, index);
        bus.write_plugin(&desc)?;
    }

    let root_node = graph.node(graph.root());
    Ok((node_plugin_name(root_node), Some(root_node.kind)))
}

fn node_desc(bus: &mut ExportBus<'_>, graph: &EntityGraph, index: usize) -> PluginDesc {
    let node = graph.node(index);
    let name = node_plugin_name(node);
    let mut desc = PluginDesc::new(node.plugin.clone(), name.clone(), node.kind);

    bus.context.push(name);
    for (key, param) in &node.params {
        let value = match param {
            Param::Link(link) => {
                let edge = graph.edges(index).iter().find(|e| &e.param == key);
                let target = match edge.and_then(|e| e.target) {
                    Some(target) => node_plugin_name(graph.node(target)),
                    None => {
                        let err = ExportError::UnresolvedReference {
                            from: node.name.clone(),
                            to: link.link.clone(),
                        };
                        let fallback = bus.defaults.for_socket(key).to_string();
                        bus.report_issue(key, &err, &fallback)
                    }
                };
                AttrValue::Ref(link_ref(target, link))
            }
            other => match param_value(other) {
                Some(value) => value,
                None => continue,
            },
        };
        desc.set(key, value);
    }
    bus.context.pop();

    desc
}
