use serde::{Deserialize, Serialize};

/// Tuning for a zone navigation mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavMeshConfig {
    /// Capacity of the polygon corridor and of the corner point scratch buffer
    pub max_nav_polys: usize,
    /// Search node budget of the engine query context
    pub max_search_nodes: usize,
    /// Half-extents used to snap path endpoints, in engine frame
    pub path_extents: [f32; 3],
    /// Half-extents used to snap the start of a random path, in engine frame
    pub random_path_extents: [f32; 3],
    /// Waypoint buffer size used by the self-test
    pub self_test_capacity: usize,
}

impl Default for NavMeshConfig {
    fn default() -> Self {
        NavMeshConfig {
            max_nav_polys: 256,
            max_search_nodes: 256,
            path_extents: [10.0, 20.0, 10.0],
            random_path_extents: [30.0, 60.0, 30.0],
            self_test_capacity: 30,
        }
    }
}

impl NavMeshConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nav_polys(mut self, max_nav_polys: usize) -> Self {
        self.max_nav_polys = max_nav_polys;
        self
    }

    pub fn with_max_search_nodes(mut self, max_search_nodes: usize) -> Self {
        self.max_search_nodes = max_search_nodes;
        self
    }

    pub fn with_path_extents(mut self, path_extents: [f32; 3]) -> Self {
        self.path_extents = path_extents;
        self
    }

    pub fn with_random_path_extents(mut self, random_path_extents: [f32; 3]) -> Self {
        self.random_path_extents = random_path_extents;
        self
    }

    pub fn with_self_test_capacity(mut self, self_test_capacity: usize) -> Self {
        self.self_test_capacity = self_test_capacity;
        self
    }
}
