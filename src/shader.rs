//! Shader program registry.
//!
//! Programs are compiled from WGSL source text and appended to a flat
//! registry keyed by index. Compilation failures are captured through a
//! device validation error scope, logged, and degrade to a module-less
//! program; passes drawing with a degraded program render nothing instead of
//! crashing, which keeps the log-and-iterate workflow intact.
//!
//! Alongside the module, each program carries its reflected vertex-stage
//! input layout (attribute location + component count), recovered from the
//! source text. The layout is what the pipeline cache matches sub-mesh
//! vertex layouts against.

/// One reflected vertex-stage input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderAttribute {
    pub location: u32,
    pub components: u32,
}

#[derive(Debug)]
pub struct Program {
    pub name: String,
    /// None when compilation failed; the program is degraded and unusable.
    pub module: Option<wgpu::ShaderModule>,
    pub vertex_inputs: Vec<ShaderAttribute>,
}

impl Program {
    pub fn is_degraded(&self) -> bool {
        self.module.is_none()
    }
}

#[derive(Debug, Default)]
pub struct ProgramRegistry {
    programs: Vec<Program>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source` under a validation error scope and register the
    /// program, returning its registry index. On compile failure the error
    /// is logged and a degraded program is stored; the caller is not
    /// expected to retry.
    pub fn load(&mut self, device: &wgpu::Device, source: &str, name: &str) -> usize {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let error = pollster::block_on(device.pop_error_scope());

        let program = match error {
            Some(e) => {
                log::error!("shader `{name}` failed to compile: {e}");
                Program {
                    name: name.to_string(),
                    module: None,
                    vertex_inputs: Vec::new(),
                }
            }
            None => Program {
                name: name.to_string(),
                module: Some(module),
                vertex_inputs: reflect_vertex_inputs(source),
            },
        };
        self.programs.push(program);
        self.programs.len() - 1
    }

    pub fn get(&self, index: usize) -> &Program {
        &self.programs[index]
    }
}

/// Recover the vertex-stage input attributes of a WGSL program by scanning
/// the `vs_main` parameter list and, for struct-typed parameters, the struct
/// fields. Only `@location` inputs count; builtins are skipped.
pub fn reflect_vertex_inputs(source: &str) -> Vec<ShaderAttribute> {
    let mut inputs = Vec::new();
    let Some(params) = entry_params(source, "vs_main") else {
        return inputs;
    };
    for param in split_top_level(params) {
        if param.contains("@location(") {
            collect_attribute(param, &mut inputs);
        } else if let Some(ty) = param.rsplit(':').next() {
            // Struct-typed parameter: reflect the struct's fields.
            if let Some(body) = struct_body(source, ty.trim()) {
                for field in split_top_level(body) {
                    collect_attribute(field, &mut inputs);
                }
            }
        }
    }
    inputs
}

/// The text between the parentheses of `fn <name>(...)`, or None.
fn entry_params<'a>(source: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("fn {name}");
    let start = source.find(&needle)? + needle.len();
    let rest = &source[start..];
    let open = rest.find('(')?;
    let mut depth = 0usize;
    for (i, c) in rest[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The text between the braces of `struct <name> { ... }`, or None.
fn struct_body<'a>(source: &'a str, name: &str) -> Option<&'a str> {
    let mut search = source;
    loop {
        let idx = search.find("struct ")?;
        let after = &search[idx + "struct ".len()..];
        let ident: String = after
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if ident == name {
            let open = after.find('{')?;
            let close = after[open..].find('}')?;
            return Some(&after[open + 1..open + close]);
        }
        search = after;
    }
}

/// Split a parameter/field list on commas that sit outside any parentheses
/// or angle brackets (so `@location(0)` and `vec3<f32>` stay intact).
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' | '<' => depth += 1,
            ')' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < list.len() {
        parts.push(&list[start..]);
    }
    parts
}

/// Parse `@location(N) name: type` out of one field/parameter, if present.
fn collect_attribute(field: &str, out: &mut Vec<ShaderAttribute>) {
    let Some(idx) = field.find("@location(") else {
        return;
    };
    let rest = &field[idx + "@location(".len()..];
    let Some(close) = rest.find(')') else { return };
    let Ok(location) = rest[..close].trim().parse::<u32>() else {
        return;
    };
    let Some(ty) = field.rsplit(':').next() else {
        return;
    };
    if let Some(components) = component_count(ty.trim()) {
        out.push(ShaderAttribute {
            location,
            components,
        });
    }
}

fn component_count(ty: &str) -> Option<u32> {
    if ty.starts_with("vec2") {
        Some(2)
    } else if ty.starts_with("vec3") {
        Some(3)
    } else if ty.starts_with("vec4") {
        Some(4)
    } else if ty == "f32" || ty == "u32" || ty == "i32" {
        Some(1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflects_struct_typed_vertex_input() {
        let source = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) tex_coords: vec2<f32>,
};
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};
@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    return out;
}
"#;
        let inputs = reflect_vertex_inputs(source);
        assert_eq!(
            inputs,
            vec![
                ShaderAttribute { location: 0, components: 3 },
                ShaderAttribute { location: 1, components: 3 },
                ShaderAttribute { location: 2, components: 2 },
            ]
        );
    }

    #[test]
    fn reflects_inline_parameters_and_skips_builtins() {
        let source = r#"
@vertex
fn vs_main(@builtin(vertex_index) index: u32,
           @location(0) position: vec3<f32>,
           @location(4) weight: f32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}
"#;
        let inputs = reflect_vertex_inputs(source);
        assert_eq!(
            inputs,
            vec![
                ShaderAttribute { location: 0, components: 3 },
                ShaderAttribute { location: 4, components: 1 },
            ]
        );
    }

    #[test]
    fn missing_entry_point_reflects_nothing() {
        assert!(reflect_vertex_inputs("fn fs_main() {}").is_empty());
    }

    #[test]
    fn fragment_outputs_are_not_vertex_inputs() {
        let source = r#"
struct VertexInput { @location(0) position: vec3<f32>, };
@vertex
fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
    return vec4<f32>(in.position, 1.0);
}
@fragment
fn fs_main(@location(0) interpolated: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(interpolated, 1.0);
}
"#;
        let inputs = reflect_vertex_inputs(source);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].location, 0);
    }
}
