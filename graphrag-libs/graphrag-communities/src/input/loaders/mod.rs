pub mod dfs;
