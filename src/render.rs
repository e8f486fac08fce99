//! Render pass orchestration.
//!
//! Each frame: pack the scene into the shared uniform buffer, prepare draw
//! plans (growing the pipeline cache where a sub-mesh meets a program for
//! the first time), then record the passes for the selected mode. The
//! "iterate entities, bind local region, draw sub-meshes" algorithm is one
//! shared routine; the forward pass, the deferred geometry pass and the
//! indicator pass all go through it.
//!
//! Mode is re-evaluated every frame; switching needs no teardown. The
//! indicator pass always runs last, clearing only depth so the markers
//! composite over the previous color result.

use std::{iter, time::Duration};

use crate::{
    context::Context,
    error::RenderError,
    frame::{pack_global_params, pack_local_params},
    gbuffer,
    packing::AlignedRegion,
    pipelines::{PipelineCache, find_pipeline},
    resources::{Drawables, texture::Texture},
    scene::Entity,
    shader::ProgramRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    Forward,
    #[default]
    Deferred,
}

/// Read-only frame statistics for a debug overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    /// Wall time of the last full frame (pack + record + submit).
    pub frame_time: Duration,
    /// Wall time of the last simulation update step.
    pub simulation_time: Duration,
}

impl FrameStats {
    pub fn fps(&self) -> f32 {
        let secs = self.frame_time.as_secs_f32();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

/// One sub-mesh draw within an entity: registry indices resolved during
/// preparation so pass recording borrows nothing mutably.
#[derive(Debug, Clone, Copy)]
pub struct SubDraw {
    pub mesh: usize,
    pub submesh: usize,
    pub pipeline: usize,
    pub material: Option<usize>,
}

#[derive(Debug)]
pub struct EntityDraw {
    pub local_offset: u32,
    pub draws: Vec<SubDraw>,
}

/// A prepared pass: the global region offset plus per-entity draws in pack
/// order. Draw order always equals pack order.
#[derive(Debug)]
pub struct DrawPlan {
    pub global_offset: u32,
    pub entities: Vec<EntityDraw>,
}

/// Build the draw plan for one pass over an entity collection, creating any
/// missing (sub-mesh, program) pipelines. Returns None when the pass's
/// program is degraded; rendering then skips the pass instead of crashing.
#[allow(clippy::too_many_arguments)]
pub fn build_draw_plan(
    device: &wgpu::Device,
    cache: &mut PipelineCache,
    programs: &ProgramRegistry,
    program_index: usize,
    drawables: &mut Drawables,
    entities: &[Entity],
    global_region: AlignedRegion,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    color_formats: &[wgpu::TextureFormat],
    depth_format: Option<wgpu::TextureFormat>,
    with_materials: bool,
) -> Result<Option<DrawPlan>, RenderError> {
    let program = programs.get(program_index);
    let Some(module) = program.module.as_ref() else {
        log::warn!("skipping pass: program `{}` is degraded", program.name);
        return Ok(None);
    };

    let mut plan_entities = Vec::with_capacity(entities.len());
    for entity in entities {
        let model = &drawables.models[entity.model];
        let mesh_index = model.mesh;
        let submesh_count = drawables.meshes[mesh_index].submeshes.len();
        let mut draws = Vec::with_capacity(submesh_count);
        for submesh_index in 0..submesh_count {
            let submesh = &mut drawables.meshes[mesh_index].submeshes[submesh_index];
            let pipeline = find_pipeline(
                cache,
                device,
                submesh,
                program_index,
                program,
                module,
                bind_group_layouts,
                color_formats,
                depth_format,
            )?;
            draws.push(SubDraw {
                mesh: mesh_index,
                submesh: submesh_index,
                pipeline,
                material: with_materials.then(|| model.materials[submesh_index]),
            });
        }
        plan_entities.push(EntityDraw {
            local_offset: entity.local_region.offset,
            draws,
        });
    }

    Ok(Some(DrawPlan {
        global_offset: global_region.offset,
        entities: plan_entities,
    }))
}

impl Context {
    /// Serialize the scene into the uniform arena: reset, global block,
    /// entity locals; then the indicator locals as a second mapped walk
    /// sharing the same head.
    pub(crate) fn pack_frame(&mut self) -> Result<(), RenderError> {
        self.projection.resize(self.config.width, self.config.height);
        let view_projection = self.projection.matrix() * self.camera.view_matrix();
        let alignment = self.arena.alignment();
        let camera_position = self.camera.position_vec();

        {
            let mut writer = self.arena.map(&self.queue);
            writer.reset();
            self.global_region =
                pack_global_params(&mut writer, camera_position, &self.scene.lights)?;
            pack_local_params(
                &mut writer,
                alignment,
                view_projection,
                &mut self.scene.entities,
            )?;
        }
        {
            let mut writer = self.arena.map(&self.queue);
            pack_local_params(
                &mut writer,
                alignment,
                view_projection,
                &mut self.scene.indicators,
            )?;
        }
        Ok(())
    }

    fn build_plan(
        &mut self,
        program_index: usize,
        indicators: bool,
        color_formats: &[wgpu::TextureFormat],
        with_materials: bool,
    ) -> Result<Option<DrawPlan>, RenderError> {
        let layouts_with_materials = [
            &self.global_layout,
            &self.local_layout,
            &self.material_layout,
        ];
        let layouts_bare = [&self.global_layout, &self.local_layout];
        let bind_group_layouts: &[&wgpu::BindGroupLayout] = if with_materials {
            &layouts_with_materials
        } else {
            &layouts_bare
        };
        build_draw_plan(
            &self.device,
            &mut self.pipelines,
            &self.programs,
            program_index,
            &mut self.drawables,
            if indicators {
                &self.scene.indicators
            } else {
                &self.scene.entities
            },
            self.global_region,
            bind_group_layouts,
            color_formats,
            Some(Texture::DEPTH_FORMAT),
            with_materials,
        )
    }

    /// The shared geometry algorithm: bind the global region once, then for
    /// each entity bind its local region and issue one indexed draw per
    /// sub-mesh.
    fn record_geometry(&self, pass: &mut wgpu::RenderPass<'_>, plan: &DrawPlan) {
        pass.set_bind_group(0, &self.global_bind_group, &[plan.global_offset]);
        for entity in &plan.entities {
            pass.set_bind_group(1, &self.local_bind_group, &[entity.local_offset]);
            for draw in &entity.draws {
                let mesh = &self.drawables.meshes[draw.mesh];
                let submesh = &mesh.submeshes[draw.submesh];
                pass.set_pipeline(self.pipelines.get(draw.pipeline));
                if let Some(material) = draw.material {
                    pass.set_bind_group(2, &self.drawables.materials[material].bind_group, &[]);
                }
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(submesh.vertex_offset..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(
                    submesh.index_offset..submesh.index_offset + submesh.index_count,
                    0,
                    0..1,
                );
            }
        }
    }

    /// Render one frame in the currently selected mode, always finishing
    /// with the light indicator pass.
    pub fn render(&mut self) -> Result<(), RenderError> {
        let frame_start = std::time::Instant::now();

        self.pack_frame()?;

        let forward_program = self.forward_program;
        let geometry_program = self.geometry_program;
        let indicator_program = self.indicator_program;
        let surface_format = self.config.format;

        let scene_plan = match self.mode {
            RenderMode::Forward => {
                self.build_plan(forward_program, false, &[surface_format], true)?
            }
            RenderMode::Deferred => {
                self.build_plan(geometry_program, false, &gbuffer::COLOR_FORMATS, true)?
            }
        };
        let indicator_plan =
            self.build_plan(indicator_program, true, &[surface_format], false)?;

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        match self.mode {
            RenderMode::Forward => {
                if let Some(plan) = &scene_plan {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Forward Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(self.clear_color),
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &self.depth_texture.view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    });
                    self.record_geometry(&mut pass, plan);
                }
            }
            RenderMode::Deferred => {
                if let Some(plan) = &scene_plan {
                    let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = self
                        .gbuffer
                        .color_attachments
                        .iter()
                        .map(|tex| {
                            Some(wgpu::RenderPassColorAttachment {
                                view: &tex.view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                                    store: wgpu::StoreOp::Store,
                                },
                                depth_slice: None,
                            })
                        })
                        .collect();
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Geometry Pass"),
                        color_attachments: &color_attachments,
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &self.gbuffer.depth.view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    });
                    self.record_geometry(&mut pass, plan);
                }

                if let Some(pipeline) = &self.compose_pipeline {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Composition Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(self.clear_color),
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment: None,
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, &self.global_bind_group, &[self.global_region.offset]);
                    pass.set_bind_group(1, &self.gbuffer.bind_group, &[]);
                    pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
                    pass.set_index_buffer(
                        self.quad_index_buffer.slice(..),
                        wgpu::IndexFormat::Uint16,
                    );
                    pass.draw_indexed(0..6, 0, 0..1);
                } else {
                    log::warn!("skipping composition: program `compose` is degraded");
                }
            }
        }

        // Light indicators always composite over the previous color result,
        // so only the depth buffer is cleared here.
        if let Some(plan) = &indicator_plan {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Indicator Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.record_geometry(&mut pass, plan);
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();

        self.stats.frame_time = frame_start.elapsed();
        Ok(())
    }
}
