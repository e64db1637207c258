pub mod mock_directory_server;
pub mod test_data;
