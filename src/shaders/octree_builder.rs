use crate::error::Result;
use crate::octree::Octree;
use crate::rendering::{Fragment, FragmentShader, ShaderContext};
use glam::Vec4;

const MARK_COLOR: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

/// Inserts the world position of every shaded fragment into a borrowed
/// tree. Expects a `pos` varying holding world coordinates.
pub struct OctreeBuilderShader<'t> {
    tree: &'t mut Octree,
    pub inserted: u64,
    pub outside: u64,
}

impl<'t> OctreeBuilderShader<'t> {
    pub fn new(tree: &'t mut Octree) -> Self {
        Self {
            tree,
            inserted: 0,
            outside: 0,
        }
    }
}

impl FragmentShader for OctreeBuilderShader<'_> {
    fn launch(&mut self, ctx: &ShaderContext, fragment: &Fragment) -> Result<Vec4> {
        let p = ctx.attribute_vec3("pos", fragment.varyings())?;
        if self.tree.add_point(p)? {
            self.inserted += 1;
        } else {
            self.outside += 1;
        }
        Ok(MARK_COLOR)
    }
}
