pub mod transform_params;
